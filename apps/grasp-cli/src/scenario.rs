//! Scripted manipulation sessions loaded from YAML.

use anyhow::Context as _;
use glam::{Mat4, Quat, Vec3};
use grasp_common::{ObjectId, Subscription, Transform};
use grasp_input::WandState;
use grasp_manip::{
    Context, EventBus, ManipulationConfig, ManipulationController, ObjectsMoved, StrategyRegistry,
};
use grasp_scene::{ObjectDesc, SceneStore};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub manipulation: ManipulationConfig,
    #[serde(default)]
    pub device: DeviceSpec,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub frames: Vec<FrameSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceSpec {
    pub buttons: usize,
    pub analogs: usize,
}

impl Default for DeviceSpec {
    fn default() -> Self {
        Self {
            buttons: 4,
            analogs: 2,
        }
    }
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectSpec {
    pub name: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// Quaternion, xyzw.
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub half_extents: Option<[f32; 3]>,
    #[serde(default = "yes")]
    pub grabbable: bool,
    #[serde(default = "yes")]
    pub intersectable: bool,
    #[serde(default)]
    pub group: bool,
    #[serde(default)]
    pub children: Vec<ObjectSpec>,
}

impl ObjectSpec {
    fn desc(&self) -> ObjectDesc {
        let mut desc = if self.group {
            // Groups sit at their parent's origin; only their bounds matter.
            ObjectDesc::group(&self.name)
        } else {
            let rotation = self
                .rotation
                .map_or(Quat::IDENTITY, |r| Quat::from_array(r).normalize());
            ObjectDesc::new(&self.name)
                .pose(Vec3::from_array(self.position), rotation)
                .grabbable(self.grabbable)
        };
        desc = desc.intersectable(self.intersectable);
        if let Some(half) = self.half_extents {
            desc = desc.half_extents(Vec3::from_array(half));
        }
        desc
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoseSpec {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl PoseSpec {
    fn matrix(&self) -> Mat4 {
        Transform::from_position_rotation(
            Vec3::from_array(self.position),
            Quat::from_array(self.rotation).normalize(),
        )
        .to_matrix()
    }
}

/// One scripted input frame. Buttons not listed are up; analogs and the
/// wand pose keep their last value when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameSpec {
    #[serde(default)]
    pub buttons: Vec<i32>,
    #[serde(default)]
    pub analogs: Vec<f32>,
    #[serde(default)]
    pub wand: Option<PoseSpec>,
    #[serde(default = "one")]
    pub repeat: u32,
}

fn one() -> u32 {
    1
}

impl Scenario {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("parsing scenario")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&text)
    }
}

/// A scene, a wand and a controller driven by a [`Scenario`].
pub struct Session {
    pub scene: SceneStore,
    pub wand: WandState,
    pub bus: EventBus,
    pub controller: ManipulationController,
    moved: Subscription<ObjectsMoved>,
}

impl Session {
    pub fn new(scenario: &Scenario, registry: &StrategyRegistry) -> anyhow::Result<Self> {
        let mut scene = SceneStore::new();
        for object in &scenario.objects {
            spawn_tree(&mut scene, None, object);
        }
        let wand = WandState::new(scenario.device.buttons, scenario.device.analogs);
        let bus = EventBus::new();
        let controller = ManipulationController::new(
            &scenario.manipulation,
            registry,
            &Context::new(&scene, &wand, &bus),
        )
        .context("building manipulation controller")?;
        let moved = bus.objects_moved.subscribe();
        Ok(Self {
            scene,
            wand,
            bus,
            controller,
            moved,
        })
    }

    /// Apply one frame's input and run the controller once. The scene's
    /// mutation log is drained afterwards so held objects do not grow it.
    pub fn step(&mut self, frame: &FrameSpec) -> anyhow::Result<Option<ObjectsMoved>> {
        self.wand.begin_frame();
        self.wand.hold_only(&frame.buttons)?;
        for (index, value) in (0..).zip(&frame.analogs) {
            self.wand.set_analog(index, *value)?;
        }
        if let Some(pose) = &frame.wand {
            self.wand.set_pose(pose.matrix());
        }
        self.controller.update(&mut self.scene, &self.wand, &self.bus);
        let events = self.scene.drain_events();
        if !events.is_empty() {
            tracing::trace!(count = events.len(), "scene events");
        }
        Ok(self.moved.drain().pop())
    }

    /// Every frame of `scenario`, with repeats expanded; one entry per
    /// controller update.
    pub fn run(&mut self, scenario: &Scenario) -> anyhow::Result<Vec<Option<ObjectsMoved>>> {
        let mut out = Vec::new();
        for frame in &scenario.frames {
            for _ in 0..frame.repeat {
                out.push(self.step(frame)?);
            }
        }
        Ok(out)
    }
}

fn spawn_tree(scene: &mut SceneStore, parent: Option<ObjectId>, spec: &ObjectSpec) {
    let id = match parent {
        Some(p) => scene.spawn_child(p, spec.desc()),
        None => Some(scene.spawn(spec.desc())),
    };
    if let Some(id) = id {
        for child in &spec.children {
            spawn_tree(scene, Some(id), child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO: &str = r#"
manipulation:
  isect_strategy: RayIntersection
  grab_strategy: SingleObjectGrab
  move_strategies: [BasicMove]
  elements:
    single_object_grab_strategy:
      grab_button_nums: "0"
objects:
  - name: shelf
    group: true
    half_extents: [5.0, 5.0, 5.0]
    children:
      - name: box
        position: [0.0, 0.0, -3.0]
frames:
  - {}
  - buttons: [0]
  - buttons: [0]
    wand: { position: [1.0, 0.0, 0.0] }
  - buttons: []
"#;

    #[test]
    fn loads_from_file_and_replays() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.frames.len(), 4);

        let registry = StrategyRegistry::with_builtins();
        let mut session = Session::new(&scenario, &registry).unwrap();
        let boxed = session.scene.find_by_name("box").unwrap();
        let batches = session.run(&scenario).unwrap();

        assert!(batches[0].is_none());
        assert!(batches[1].is_some());
        let last_move = batches[2].as_ref().unwrap();
        assert_eq!(last_move.moves.len(), 1);
        assert_eq!(last_move.moves[0].0, boxed);
        assert!(batches[3].is_none());

        let world = session.scene.world_transform(boxed).w_axis.truncate();
        assert!(world.abs_diff_eq(Vec3::new(1.0, 0.0, -3.0), 1e-5));
        assert!(session.controller.grabbed_objects().is_empty());
    }

    #[test]
    fn repeat_expands_frames() {
        let mut scenario = Scenario::from_yaml_str(SCENARIO).unwrap();
        scenario.frames = vec![FrameSpec {
            buttons: vec![],
            analogs: vec![],
            wand: None,
            repeat: 3,
        }];
        let mut session = Session::new(&scenario, &StrategyRegistry::with_builtins()).unwrap();
        assert_eq!(session.run(&scenario).unwrap().len(), 3);
        assert_eq!(session.controller.frame(), 3);
    }

    #[test]
    fn held_object_does_not_grow_scene_log() {
        let scenario = Scenario::from_yaml_str(SCENARIO).unwrap();
        let mut session = Session::new(&scenario, &StrategyRegistry::with_builtins()).unwrap();
        let mut frame = FrameSpec {
            buttons: vec![0],
            analogs: vec![],
            wand: None,
            repeat: 1,
        };
        for i in 0..200 {
            frame.wand = Some(PoseSpec {
                position: [0.0, i as f32 * 0.01, 0.0],
                rotation: identity_rotation(),
            });
            session.step(&frame).unwrap();
            assert!(session.scene.events().is_empty());
        }
        assert_eq!(session.controller.grabbed_objects().len(), 1);
    }

    #[test]
    fn bad_button_is_an_error() {
        let scenario = Scenario::from_yaml_str(SCENARIO).unwrap();
        let mut session = Session::new(&scenario, &StrategyRegistry::with_builtins()).unwrap();
        let frame = FrameSpec {
            buttons: vec![9],
            analogs: vec![],
            wand: None,
            repeat: 1,
        };
        assert!(session.step(&frame).is_err());
    }

    #[test]
    fn missing_element_fails_validation() {
        let yaml = "manipulation:\n  isect_strategy: RayIntersection\n  grab_strategy: MultiObjectGrab";
        let scenario = Scenario::from_yaml_str(yaml).unwrap();
        let err = Session::new(&scenario, &StrategyRegistry::with_builtins())
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("multi_object_grab_strategy"));
    }
}
