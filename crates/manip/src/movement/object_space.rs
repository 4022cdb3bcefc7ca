use glam::{Mat4, Quat, Vec3};
use grasp_common::{ObjectId, rigid_inverse};
use std::collections::BTreeMap;

use super::MoveStrategy;
use crate::{ConfigElement, Context, ManipError};

pub const ELEMENT: &str = "object_space_move_strategy";

#[derive(Debug, Clone, Copy)]
struct GrabState {
    wand_at_grab: Mat4,
    wand_inv: Mat4,
    /// Local pose at grab; its origin is the pivot for wand rotation.
    grab_pose: Mat4,
}

/// Applies the wand's motion since grab to each object in its own frame.
///
/// The translation and rotation the wand made since the object was grabbed
/// are re-expressed in the object's current parent space and applied about
/// the object's grab-time origin. Twisting the wand spins the object in
/// place instead of swinging it around the wand.
#[derive(Debug, Default)]
pub struct ObjectSpaceMove {
    grabbed: BTreeMap<ObjectId, GrabState>,
}

impl ObjectSpaceMove {
    pub fn from_config(element: Option<&ConfigElement>) -> Result<Self, ManipError> {
        if let Some(e) = element {
            e.require_version(1)?;
        }
        Ok(Self::default())
    }
}

impl MoveStrategy for ObjectSpaceMove {
    fn name(&self) -> &str {
        "ObjectSpaceMove"
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
            let grab_pose = ctx.scene.transform(object).unwrap_or(Mat4::IDENTITY);
            self.grabbed.insert(
                object,
                GrabState {
                    wand_at_grab: wand,
                    wand_inv,
                    grab_pose,
                },
            );
        }
    }

    fn objects_released(&mut self, _ctx: &Context<'_>, objects: &[ObjectId]) {
        for object in objects {
            self.grabbed.remove(object);
        }
    }

    fn compute_move(
        &mut self,
        ctx: &Context<'_>,
        object: ObjectId,
        wand: Mat4,
        previous: Mat4,
    ) -> Mat4 {
        let Some(state) = self.grabbed.get(&object) else {
            return previous;
        };
        let parent = ctx.scene.parent_world_transform(object);
        let parent_inv = rigid_inverse(&parent);

        let translation_world = wand.w_axis.truncate() - state.wand_at_grab.w_axis.truncate();
        let rotation_world = Quat::from_mat4(&(wand * state.wand_inv));
        let translation = parent_inv.transform_vector3(translation_world);
        let rotation =
            (Quat::from_mat4(&parent_inv) * rotation_world * Quat::from_mat4(&parent)).normalize();

        let pivot = state.grab_pose.w_axis.truncate();
        Mat4::from_translation(pivot + translation)
            * Mat4::from_quat(rotation)
            * Mat4::from_translation(-pivot)
            * previous
    }

    fn tracked(&self) -> usize {
        self.grabbed.len()
    }
}
