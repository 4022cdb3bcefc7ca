use glam::{Mat4, Vec3};
use grasp_common::{ObjectId, rigid_inverse};

use super::MoveStrategy;
use crate::{ConfigElement, Context, ManipError};

pub const ELEMENT: &str = "center_point_move_strategy";

/// Snaps each grabbed object's origin and orientation onto the wand.
///
/// Nothing is cached at grab; every frame the result is
/// inverse(parent-to-world now) × wand, so the pose the object had relative
/// to the wand at grab time is deliberately discarded.
#[derive(Debug, Default)]
pub struct CenterPointMove;

impl CenterPointMove {
    pub fn from_config(element: Option<&ConfigElement>) -> Result<Self, ManipError> {
        if let Some(e) = element {
            e.require_version(1)?;
        }
        Ok(Self)
    }
}

impl MoveStrategy for CenterPointMove {
    fn name(&self) -> &str {
        "CenterPointMove"
    }

    fn objects_grabbed(
        &mut self,
        _ctx: &Context<'_>,
        _objects: &[ObjectId],
        _point: Vec3,
        _wand: Mat4,
    ) {
    }

    fn objects_released(&mut self, _ctx: &Context<'_>, _objects: &[ObjectId]) {}

    fn compute_move(
        &mut self,
        ctx: &Context<'_>,
        object: ObjectId,
        wand: Mat4,
        _previous: Mat4,
    ) -> Mat4 {
        rigid_inverse(&ctx.scene.parent_world_transform(object)) * wand
    }

    fn tracked(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Rig;
    use glam::Quat;
    use grasp_scene::ObjectDesc;

    #[test]
    fn object_lands_on_wand_in_world() {
        let mut rig = Rig::new();
        let parent = rig.scene.spawn(ObjectDesc::new("parent").pose(
            Vec3::new(0.0, 1.0, 0.0),
            Quat::from_rotation_z(0.5),
        ));
        let child = rig
            .scene
            .spawn_child(parent, ObjectDesc::new("child").at(Vec3::new(3.0, 0.0, 0.0)))
            .unwrap();
        let wand =
            Mat4::from_rotation_translation(Quat::from_rotation_x(0.2), Vec3::new(1.0, 2.0, -1.0));

        let mut m = CenterPointMove;
        m.objects_grabbed(&rig.ctx(), &[child], Vec3::ZERO, Mat4::IDENTITY);
        let local = m.compute_move(&rig.ctx(), child, wand, Mat4::IDENTITY);
        rig.scene.set_transform(child, local);
        assert!(rig.scene.world_transform(child).abs_diff_eq(wand, 1e-5));
    }
}
