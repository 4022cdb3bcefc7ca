//! Typed publish/subscribe channels shared by the controller, the strategies
//! and whoever observes manipulation (highlighting, sound, replication).
//!
//! Delivery is synchronous and ordered: `publish` enqueues into every live
//! subscription before returning, and subscribers drain during their own
//! update call.

use glam::{Mat4, Vec3};
use grasp_common::{Channel, ObjectId};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::Context;

/// One frame's worth of applied transforms, published as a single batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectsMoved {
    pub frame: u64,
    /// Object and its new local transform, in move order.
    pub moves: Vec<(ObjectId, Mat4)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntersectionEvent {
    /// `point` is in world coordinates.
    Intersected { object: ObjectId, point: Vec3 },
    Deintersected { object: ObjectId },
}

/// A slot's answer to a grab signal.
#[derive(Debug, Clone, PartialEq)]
pub struct GrabAnswer {
    pub objects: Vec<ObjectId>,
    pub point: Vec3,
}

/// Receiver of the choose/grab/release signals raised by a signal-driven
/// grab strategy. Lets another input-mapping module decide what is grabbed.
pub trait GrabSignalSlot {
    fn choose(&mut self, ctx: &Context<'_>);
    /// Objects to grab now, or `None` to abstain.
    fn grab(&mut self, ctx: &Context<'_>) -> Option<GrabAnswer>;
    /// Objects to release now.
    fn release(&mut self, ctx: &Context<'_>) -> Vec<ObjectId>;
    /// Called once per frame, focused or not. `evicted` lists objects the
    /// grab dropped outside a release signal; a slot must forget them.
    fn refresh(&mut self, _ctx: &Context<'_>, _evicted: &[ObjectId]) {}
}

/// Signal hub for [`GrabSignalSlot`]s plus the asynchronous release channel.
///
/// Slots are held weakly; a slot dropped by its owner stops answering.
#[derive(Default)]
pub struct GrabSignals {
    slots: RefCell<Vec<Weak<RefCell<dyn GrabSignalSlot>>>>,
    /// Evicts the listed objects from a signal-driven grab.
    pub async_release: Channel<Vec<ObjectId>>,
}

impl std::fmt::Debug for GrabSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrabSignals")
            .field("slots", &self.slot_count())
            .field("async_release", &self.async_release)
            .finish()
    }
}

impl GrabSignals {
    pub fn connect(&self, slot: &Rc<RefCell<dyn GrabSignalSlot>>) {
        self.slots.borrow_mut().push(Rc::downgrade(slot));
    }

    pub fn slot_count(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    // Upgraded up front so a slot may touch the hub while answering.
    fn live(&self) -> Vec<Rc<RefCell<dyn GrabSignalSlot>>> {
        let mut slots = self.slots.borrow_mut();
        slots.retain(|s| s.strong_count() > 0);
        slots.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn choose(&self, ctx: &Context<'_>) {
        for slot in self.live() {
            slot.borrow_mut().choose(ctx);
        }
    }

    pub fn grab(&self, ctx: &Context<'_>) -> Vec<GrabAnswer> {
        self.live()
            .into_iter()
            .filter_map(|slot| slot.borrow_mut().grab(ctx))
            .collect()
    }

    pub fn release(&self, ctx: &Context<'_>) -> Vec<ObjectId> {
        self.live()
            .into_iter()
            .flat_map(|slot| slot.borrow_mut().release(ctx))
            .collect()
    }

    pub fn refresh(&self, ctx: &Context<'_>, evicted: &[ObjectId]) {
        for slot in self.live() {
            slot.borrow_mut().refresh(ctx, evicted);
        }
    }
}

/// All manipulation channels. Owned by the host, lent to strategies through
/// [`Context`].
#[derive(Debug, Default)]
pub struct EventBus {
    pub objects_moved: Channel<ObjectsMoved>,
    pub intersection: Channel<IntersectionEvent>,
    pub objects_selected: Channel<Vec<ObjectId>>,
    pub objects_deselected: Channel<Vec<ObjectId>>,
    pub selection_list_expanded: Channel<Vec<ObjectId>>,
    pub selection_list_reduced: Channel<Vec<ObjectId>>,
    /// Shows or hides a strategy's visual ray.
    pub ray_visibility: Channel<bool>,
    pub grab_signals: GrabSignals,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }
}
