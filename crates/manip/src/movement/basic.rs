use glam::{Mat4, Vec3};
use grasp_common::{ObjectId, rigid_inverse};
use std::collections::BTreeMap;

use super::MoveStrategy;
use crate::{ConfigElement, Context, ManipError};

pub const ELEMENT: &str = "basic_move_strategy";

/// Moves objects rigidly with the wand, keeping the pose each object had
/// relative to the wand when it was grabbed.
#[derive(Debug, Default)]
pub struct BasicMove {
    /// inverse(wand at grab) × parent-to-world at grab.
    offsets: BTreeMap<ObjectId, Mat4>,
}

impl BasicMove {
    pub fn from_config(element: Option<&ConfigElement>) -> Result<Self, ManipError> {
        if let Some(e) = element {
            e.require_version(1)?;
        }
        Ok(Self::default())
    }
}

impl MoveStrategy for BasicMove {
    fn name(&self) -> &str {
        "BasicMove"
    }

    fn objects_grabbed(
        &mut self,
        ctx: &Context<'_>,
        objects: &[ObjectId],
        _point: Vec3,
        wand: Mat4,
    ) {
        let wand_inv = rigid_inverse(&wand);
        for &object in objects {
            self.offsets
                .insert(object, wand_inv * ctx.scene.parent_world_transform(object));
        }
    }

    fn objects_released(&mut self, _ctx: &Context<'_>, objects: &[ObjectId]) {
        for object in objects {
            self.offsets.remove(object);
        }
    }

    fn compute_move(
        &mut self,
        ctx: &Context<'_>,
        object: ObjectId,
        wand: Mat4,
        previous: Mat4,
    ) -> Mat4 {
        let Some(offset) = self.offsets.get(&object) else {
            return previous;
        };
        rigid_inverse(&ctx.scene.parent_world_transform(object)) * wand * *offset * previous
    }

    fn tracked(&self) -> usize {
        self.offsets.len()
    }
}
