use grasp_common::{ObjectId, Transform};
use grasp_manip::ManipulationController;
use grasp_scene::{NodeKind, SceneStore, Traverse};
use serde::Serialize;

/// Read-only queries against the scene and the controller, for debug output.
pub struct SceneInspector;

impl SceneInspector {
    pub fn summary(scene: &SceneStore) -> SceneSummary {
        let mut summary = SceneSummary {
            objects: scene.len(),
            roots: scene.roots().len(),
            grabbable: 0,
            groups: 0,
            pending_events: scene.events().len(),
        };
        for (_, object) in scene.objects() {
            if object.is_grabbable() {
                summary.grabbable += 1;
            }
            if object.kind() == NodeKind::Group {
                summary.groups += 1;
            }
        }
        summary
    }

    /// Local and world pose of one object.
    pub fn inspect_object(scene: &SceneStore, id: ObjectId) -> Option<ObjectInfo> {
        let object = scene.get(id)?;
        let depth = std::iter::successors(object.parent(), |&p| scene.parent(p)).count();
        Some(ObjectInfo {
            id,
            name: object.name().to_string(),
            depth,
            local: Transform::from_matrix(&object.local()),
            world: Transform::from_matrix(&scene.world_transform(id)),
            grabbable: object.is_grabbable(),
            intersectable: object.is_intersectable(),
        })
    }

    /// Every object, depth-first from the roots in spawn order.
    pub fn list_objects(scene: &SceneStore) -> Vec<ObjectInfo> {
        let mut ids = Vec::with_capacity(scene.len());
        scene.traverse(scene.roots(), |id, _| {
            ids.push(id);
            Traverse::Continue
        });
        ids.into_iter()
            .filter_map(|id| Self::inspect_object(scene, id))
            .collect()
    }

    pub fn controller(controller: &ManipulationController) -> ControllerSummary {
        ControllerSummary {
            frame: controller.frame(),
            isect: controller.isect_name().to_string(),
            grab: controller.grab_name().to_string(),
            moves: controller
                .move_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            grabbed: controller.grabbed_objects(),
            intersected: controller.current_intersection().map(|i| i.object),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneSummary {
    pub objects: usize,
    pub roots: usize,
    pub grabbable: usize,
    pub groups: usize,
    pub pending_events: usize,
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene: objects={} roots={} grabbable={} groups={} pending_events={}",
            self.objects, self.roots, self.grabbable, self.groups, self.pending_events
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub name: String,
    /// Number of ancestors.
    pub depth: usize,
    pub local: Transform,
    pub world: Transform,
    pub grabbable: bool,
    pub intersectable: bool,
}

impl std::fmt::Display for ObjectInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = self.world.position;
        write!(
            f,
            "{:indent$}{} [{}] world=({:.2}, {:.2}, {:.2})",
            "",
            self.name,
            self.id.short(),
            p.x,
            p.y,
            p.z,
            indent = self.depth * 2,
        )?;
        if !self.grabbable {
            f.write_str(" fixed")?;
        }
        if !self.intersectable {
            f.write_str(" hidden")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerSummary {
    pub frame: u64,
    pub isect: String,
    pub grab: String,
    pub moves: Vec<String>,
    pub grabbed: Vec<ObjectId>,
    pub intersected: Option<ObjectId>,
}

impl std::fmt::Display for ControllerSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Controller: frame={} isect={} grab={} moves=[{}] grabbed={}",
            self.frame,
            self.isect,
            self.grab,
            self.moves.join(", "),
            self.grabbed.len()
        )?;
        if let Some(id) = self.intersected {
            write!(f, " pointing_at={}", id.short())?;
        }
        Ok(())
    }
}
