use grasp_input::DeviceState;
use grasp_scene::SceneStore;

use crate::event::EventBus;

/// Everything a strategy may read during one call.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub scene: &'a SceneStore,
    pub device: &'a dyn DeviceState,
    pub bus: &'a EventBus,
}

impl<'a> Context<'a> {
    pub fn new(scene: &'a SceneStore, device: &'a dyn DeviceState, bus: &'a EventBus) -> Self {
        Self { scene, device, bus }
    }
}
