//! Per-frame orchestration of the configured strategies.

use glam::{Mat4, Vec3};
use grasp_common::{ObjectId, Subscription};
use grasp_input::DeviceState;
use grasp_scene::{GrabbableChanged, SceneStore};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info};

use crate::{
    Context, EventBus, GrabCallbacks, GrabStrategy, Intersection, IntersectionEvent,
    IntersectionStrategy, ManipError, ManipulationConfig, MoveStrategy, ObjectsMoved,
    StrategyRegistry,
};

#[derive(Debug, Clone)]
enum Transition {
    Grabbed(Vec<ObjectId>, Vec3),
    Released(Vec<ObjectId>),
}

/// Drives one intersection strategy, one grab strategy and a chain of move
/// strategies against the scene.
///
/// Holds the local transform each grabbed object had when it was grabbed;
/// that value seeds the move chain every frame.
pub struct ManipulationController {
    isect: Box<dyn IntersectionStrategy>,
    grab: Box<dyn GrabStrategy>,
    moves: Vec<Box<dyn MoveStrategy>>,
    cache: BTreeMap<ObjectId, Mat4>,
    transitions: Rc<RefCell<Vec<Transition>>>,
    grabbable: Subscription<GrabbableChanged>,
    current: Option<Intersection>,
    focused: bool,
    frame: u64,
}

impl std::fmt::Debug for ManipulationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManipulationController")
            .field("isect", &self.isect.name())
            .field("grab", &self.grab.name())
            .field("moves", &self.move_names())
            .field("grabbed", &self.cache.len())
            .field("focused", &self.focused)
            .field("frame", &self.frame)
            .finish()
    }
}

impl ManipulationController {
    /// Build and initialise every configured strategy.
    pub fn new(
        config: &ManipulationConfig,
        registry: &StrategyRegistry,
        ctx: &Context<'_>,
    ) -> Result<Self, ManipError> {
        let mut isect = registry.make_isect(&config.isect_strategy, config)?;
        let mut grab = registry.make_grab(&config.grab_strategy, config)?;
        let mut moves = config
            .move_strategies
            .iter()
            .map(|name| registry.make_move(name, config))
            .collect::<Result<Vec<_>, _>>()?;

        isect.init(ctx)?;
        let transitions = Rc::new(RefCell::new(Vec::new()));
        let (on_grab, on_release) = (transitions.clone(), transitions.clone());
        let callbacks = GrabCallbacks::new(
            move |objects: &[ObjectId], point| {
                on_grab
                    .borrow_mut()
                    .push(Transition::Grabbed(objects.to_vec(), point));
            },
            move |objects: &[ObjectId]| {
                on_release
                    .borrow_mut()
                    .push(Transition::Released(objects.to_vec()));
            },
        );
        grab.init(ctx, callbacks)?;
        for m in &mut moves {
            m.init(ctx)?;
        }

        let controller = Self {
            isect,
            grab,
            moves,
            cache: BTreeMap::new(),
            transitions,
            grabbable: ctx.scene.subscribe_grabbable(),
            current: None,
            focused: true,
            frame: 0,
        };
        info!(
            isect = controller.isect_name(),
            grab = controller.grab_name(),
            moves = ?controller.move_names(),
            "manipulation controller ready"
        );
        Ok(controller)
    }

    pub fn set_focus(&mut self, active: bool) {
        self.focused = active;
        self.grab.set_focus(active);
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Run one frame. Does nothing while unfocused.
    pub fn update(&mut self, scene: &mut SceneStore, device: &dyn DeviceState, bus: &EventBus) {
        if !self.focused {
            return;
        }
        self.frame += 1;
        let _span = tracing::debug_span!("manip_update", frame = self.frame).entered();

        let moves = {
            let ctx = Context::new(scene, device, bus);
            self.intersect(&ctx);
            self.grab.update(&ctx);
            self.force_release(&ctx);
            self.sync_grabbed(&ctx);
            self.compute_moves(&ctx)
        };

        for &(object, transform) in &moves {
            scene.set_transform(object, transform);
        }
        if !moves.is_empty() {
            debug!(count = moves.len(), "objects moved");
            bus.objects_moved.publish(ObjectsMoved {
                frame: self.frame,
                moves,
            });
        }
    }

    fn intersect(&mut self, ctx: &Context<'_>) {
        self.isect.update(ctx);
        let found = self.isect.find_intersection(ctx, ctx.scene.roots());
        let before = self.current.map(|i| i.object);
        let after = found.map(|i| i.object);
        if before != after {
            if let Some(object) = before {
                ctx.bus
                    .intersection
                    .publish(IntersectionEvent::Deintersected { object });
            }
            if let Some(hit) = found {
                debug!(object = %hit.object, "intersected");
                ctx.bus.intersection.publish(IntersectionEvent::Intersected {
                    object: hit.object,
                    point: hit.point,
                });
            }
        }
        self.current = found;
    }

    /// Release cached objects that lost their grabbable flag or were
    /// despawned, in case the grab strategy did not.
    fn force_release(&mut self, ctx: &Context<'_>) {
        let mut stale: Vec<ObjectId> = self
            .grabbable
            .drain()
            .into_iter()
            .filter(|e| !e.grabbable && self.cache.contains_key(&e.object))
            .map(|e| e.object)
            .collect();
        stale.extend(self.cache.keys().filter(|&&o| !ctx.scene.contains(o)));
        stale.sort();
        stale.dedup();
        if !stale.is_empty() {
            info!(count = stale.len(), "forcing release of non-grabbable objects");
            self.grab.release_objects(ctx, &stale);
        }
    }

    fn sync_grabbed(&mut self, ctx: &Context<'_>) {
        let grabbed = self.grab.grabbed_objects();
        let transitions: Vec<Transition> = self.transitions.borrow_mut().drain(..).collect();
        for t in &transitions {
            if let Transition::Released(objects) = t {
                debug!(?objects, "release reported");
            }
        }

        let released: Vec<ObjectId> = self
            .cache
            .keys()
            .copied()
            .filter(|o| !grabbed.contains(o))
            .collect();
        if !released.is_empty() {
            for m in &mut self.moves {
                m.objects_released(ctx, &released);
            }
            for o in &released {
                self.cache.remove(o);
            }
            debug!(count = released.len(), "objects released");
            ctx.bus.objects_deselected.publish(released);
        }

        let new: Vec<ObjectId> = grabbed
            .iter()
            .copied()
            .filter(|o| !self.cache.contains_key(o))
            .collect();
        if new.is_empty() {
            return;
        }
        let wand = ctx.device.pose();
        let point = transitions
            .iter()
            .rev()
            .find_map(|t| match t {
                Transition::Grabbed(objects, point) if objects.iter().any(|o| new.contains(o)) => {
                    Some(*point)
                }
                _ => None,
            })
            .unwrap_or_else(|| wand.w_axis.truncate());
        for m in &mut self.moves {
            m.objects_grabbed(ctx, &new, point, wand);
        }
        for &o in &new {
            self.cache
                .insert(o, ctx.scene.transform(o).unwrap_or(Mat4::IDENTITY));
        }
        debug!(count = new.len(), "objects grabbed");
        ctx.bus.objects_selected.publish(new);
    }

    fn compute_moves(&mut self, ctx: &Context<'_>) -> Vec<(ObjectId, Mat4)> {
        let wand = ctx.device.pose();
        let mut out = Vec::with_capacity(self.cache.len());
        for object in self.grab.grabbed_objects() {
            let Some(&start) = self.cache.get(&object) else {
                continue;
            };
            if !ctx.scene.contains(object) {
                continue;
            }
            let transform = self
                .moves
                .iter_mut()
                .fold(start, |prev, m| m.compute_move(ctx, object, wand, prev));
            out.push((object, transform));
        }
        out
    }

    /// Grabbed objects in grab order.
    pub fn grabbed_objects(&self) -> Vec<ObjectId> {
        self.grab.grabbed_objects()
    }

    pub fn current_intersection(&self) -> Option<Intersection> {
        self.current
    }

    /// Number of focused frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn visual_ray(&self) -> Option<(Vec3, Vec3)> {
        self.isect.visual_ray()
    }

    pub fn isect_name(&self) -> &str {
        self.isect.name()
    }

    pub fn grab_name(&self) -> &str {
        self.grab.name()
    }

    pub fn move_names(&self) -> Vec<&str> {
        self.moves.iter().map(|m| m.name()).collect()
    }
}
