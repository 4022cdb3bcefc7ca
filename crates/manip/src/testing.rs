//! Shared fixtures for strategy and controller tests.

use glam::Vec3;
use grasp_common::ObjectId;
use grasp_input::WandState;
use grasp_scene::SceneStore;
use std::cell::RefCell;
use std::rc::Rc;

use crate::{Context, EventBus, GrabCallbacks, IntersectionEvent};

pub(crate) struct Rig {
    pub scene: SceneStore,
    pub wand: WandState,
    pub bus: EventBus,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            scene: SceneStore::new(),
            wand: WandState::new(4, 2),
            bus: EventBus::new(),
        }
    }

    pub fn ctx(&self) -> Context<'_> {
        Context::new(&self.scene, &self.wand, &self.bus)
    }

    /// Start a new frame holding exactly `held`.
    pub fn frame(&mut self, held: &[i32]) {
        self.wand.begin_frame();
        self.wand.hold_only(held).unwrap();
    }

    pub fn intersect(&self, object: ObjectId) {
        self.bus.intersection.publish(IntersectionEvent::Intersected {
            object,
            point: Vec3::ZERO,
        });
    }

    pub fn deintersect(&self, object: ObjectId) {
        self.bus
            .intersection
            .publish(IntersectionEvent::Deintersected { object });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Grab(Vec<ObjectId>),
    Release(Vec<ObjectId>),
}

pub(crate) type CallLog = Rc<RefCell<Vec<Call>>>;

/// Callbacks that record every invocation.
pub(crate) fn recorder() -> (GrabCallbacks, CallLog) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let (g, r) = (log.clone(), log.clone());
    let callbacks = GrabCallbacks::new(
        move |objects: &[ObjectId], _point| g.borrow_mut().push(Call::Grab(objects.to_vec())),
        move |objects: &[ObjectId]| r.borrow_mut().push(Call::Release(objects.to_vec())),
    );
    (callbacks, log)
}
