//! Grab strategies: turn wand input and intersection results into
//! grab/release transitions.
//!
//! Every strategy reports transitions through the [`GrabCallbacks`] bound
//! at `init`, keeps its grabbed list in grab order, and evicts an object
//! (with a release callback) the moment its `grabbable` flag is cleared.

pub(crate) mod multi;
pub(crate) mod signal;
pub(crate) mod single;

pub use multi::MultiObjectGrab;
pub use signal::{SelectionListSlot, SignalGrab};
pub use single::SingleObjectGrab;

use glam::Vec3;
use grasp_common::{ObjectId, Subscription};
use grasp_scene::GrabbableChanged;

use crate::{Context, IntersectionEvent, ManipError};

type GrabFn = Box<dyn FnMut(&[ObjectId], Vec3)>;
type ReleaseFn = Box<dyn FnMut(&[ObjectId])>;

/// Grab and release notifications from a strategy to its owner.
pub struct GrabCallbacks {
    on_grab: GrabFn,
    on_release: ReleaseFn,
}

impl GrabCallbacks {
    pub fn new(
        on_grab: impl FnMut(&[ObjectId], Vec3) + 'static,
        on_release: impl FnMut(&[ObjectId]) + 'static,
    ) -> Self {
        Self {
            on_grab: Box::new(on_grab),
            on_release: Box::new(on_release),
        }
    }

    pub fn grabbed(&mut self, objects: &[ObjectId], point: Vec3) {
        (self.on_grab)(objects, point);
    }

    pub fn released(&mut self, objects: &[ObjectId]) {
        (self.on_release)(objects);
    }
}

impl Default for GrabCallbacks {
    fn default() -> Self {
        Self::new(|_, _| {}, |_| {})
    }
}

pub trait GrabStrategy {
    fn name(&self) -> &str;

    /// Bind callbacks and subscribe to the channels the strategy listens on.
    fn init(&mut self, ctx: &Context<'_>, callbacks: GrabCallbacks) -> Result<(), ManipError>;

    /// Only a focused strategy reacts to buttons. Subscriptions are still
    /// drained while unfocused.
    fn set_focus(&mut self, active: bool);

    fn update(&mut self, ctx: &Context<'_>);

    /// Currently grabbed objects, in grab order.
    fn grabbed_objects(&self) -> Vec<ObjectId>;

    /// Release the listed objects that are currently grabbed. Others are
    /// ignored without a callback.
    fn release_objects(&mut self, ctx: &Context<'_>, objects: &[ObjectId]);
}

/// Channel inputs shared by the button-polling strategies.
#[derive(Default)]
pub(crate) struct Inputs {
    intersections: Option<Subscription<IntersectionEvent>>,
    grabbable: Option<Subscription<GrabbableChanged>>,
    /// Latest intersected object and hit point.
    pub current: Option<(ObjectId, Vec3)>,
}

impl Inputs {
    pub fn connect(&mut self, ctx: &Context<'_>, intersections: bool) {
        if intersections {
            self.intersections = Some(ctx.bus.intersection.subscribe());
        }
        self.grabbable = Some(ctx.scene.subscribe_grabbable());
    }

    pub fn poll_intersections(&mut self) {
        let Some(sub) = &self.intersections else {
            return;
        };
        for event in sub.drain() {
            match event {
                IntersectionEvent::Intersected { object, point } => {
                    self.current = Some((object, point));
                }
                IntersectionEvent::Deintersected { object } => {
                    if self.current.is_some_and(|(o, _)| o == object) {
                        self.current = None;
                    }
                }
            }
        }
    }

    /// Objects whose `grabbable` flag was cleared since the last poll.
    pub fn cleared_grabbables(&self) -> Vec<ObjectId> {
        self.grabbable
            .as_ref()
            .map(|s| {
                s.drain()
                    .into_iter()
                    .filter(|e| !e.grabbable)
                    .map(|e| e.object)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Remove `objects` from `list`, returning the ones that were present.
pub(crate) fn take_present(list: &mut Vec<ObjectId>, objects: &[ObjectId]) -> Vec<ObjectId> {
    let taken: Vec<ObjectId> = list
        .iter()
        .copied()
        .filter(|o| objects.contains(o))
        .collect();
    list.retain(|o| !objects.contains(o));
    taken
}
