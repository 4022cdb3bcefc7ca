use grasp_common::{ObjectId, rigid_inverse};
use grasp_scene::{NodeKind, Traverse};

use super::{Intersection, IntersectionStrategy};
use crate::{ConfigElement, Context, ManipError};

pub const ELEMENT: &str = "point_intersection_strategy";

/// Treats the wand tip as a point and walks each candidate subtree
/// depth-first, skipping subtrees whose combined box misses the point. The
/// first transform-bearing node whose own box contains the point wins and
/// shadows its descendants.
#[derive(Debug, Default)]
pub struct PointIntersection;

impl PointIntersection {
    pub fn from_config(element: Option<&ConfigElement>) -> Result<Self, ManipError> {
        if let Some(e) = element {
            e.require_version(1)?;
        }
        Ok(Self)
    }
}

impl IntersectionStrategy for PointIntersection {
    fn name(&self) -> &str {
        "PointIntersection"
    }

    fn find_intersection(
        &self,
        ctx: &Context<'_>,
        candidates: &[ObjectId],
    ) -> Option<Intersection> {
        let point = ctx.device.pose().w_axis.truncate();
        let mut found = None;

        ctx.scene.traverse(candidates, |id, obj| {
            let local = rigid_inverse(&ctx.scene.world_transform(id)).transform_point3(point);
            if !ctx.scene.subtree_bounds(id).is_some_and(|b| b.contains(local)) {
                return Traverse::Skip;
            }
            let own_hit = obj.is_intersectable()
                && obj.kind() == NodeKind::Transform
                && obj.bounds().contains(local);
            if own_hit {
                found = Some(Intersection { object: id, point });
                Traverse::Stop
            } else {
                Traverse::Continue
            }
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Rig;
    use glam::{Mat4, Vec3};
    use grasp_scene::ObjectDesc;

    #[test]
    fn contained_point_matches() {
        let mut rig = Rig::new();
        let a = rig.scene.spawn(ObjectDesc::new("a").at(Vec3::new(0.0, 0.0, -1.0)));
        rig.wand.set_pose(Mat4::from_translation(Vec3::new(0.1, 0.0, -1.2)));
        let ctx = rig.ctx();
        let hit = PointIntersection.find_intersection(&ctx, ctx.scene.roots()).unwrap();
        assert_eq!(hit.object, a);
        assert_eq!(hit.point, Vec3::new(0.1, 0.0, -1.2));
    }

    #[test]
    fn matched_node_shadows_descendants() {
        let mut rig = Rig::new();
        let outer = rig
            .scene
            .spawn(ObjectDesc::new("outer").half_extents(Vec3::splat(2.0)));
        let _inner = rig.scene.spawn_child(outer, ObjectDesc::new("inner")).unwrap();
        let ctx = rig.ctx();
        let hit = PointIntersection.find_intersection(&ctx, ctx.scene.roots()).unwrap();
        assert_eq!(hit.object, outer);
    }

    #[test]
    fn group_containment_descends() {
        let mut rig = Rig::new();
        let group = rig
            .scene
            .spawn(ObjectDesc::group("group").half_extents(Vec3::splat(3.0)));
        let leaf = rig
            .scene
            .spawn_child(group, ObjectDesc::new("leaf").at(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        rig.wand.set_pose(Mat4::from_translation(Vec3::new(1.2, 0.0, 0.0)));
        let ctx = rig.ctx();
        let hit = PointIntersection.find_intersection(&ctx, ctx.scene.roots()).unwrap();
        assert_eq!(hit.object, leaf);
    }

    #[test]
    fn child_outside_parent_box_matches() {
        let mut rig = Rig::new();
        let table = rig.scene.spawn(ObjectDesc::new("table"));
        let cup = rig
            .scene
            .spawn_child(table, ObjectDesc::new("cup").at(Vec3::new(2.0, 0.0, 0.0)))
            .unwrap();
        rig.wand.set_pose(Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        let ctx = rig.ctx();
        let hit = PointIntersection.find_intersection(&ctx, ctx.scene.roots()).unwrap();
        assert_eq!(hit.object, cup);
    }

    #[test]
    fn point_between_parent_and_child_is_none() {
        let mut rig = Rig::new();
        let table = rig.scene.spawn(ObjectDesc::new("table"));
        rig.scene
            .spawn_child(table, ObjectDesc::new("cup").at(Vec3::new(2.0, 0.0, 0.0)))
            .unwrap();
        // Inside the subtree's combined box, outside both own boxes.
        rig.wand.set_pose(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        let ctx = rig.ctx();
        assert!(PointIntersection.find_intersection(&ctx, ctx.scene.roots()).is_none());
    }
}
