use glam::Vec3;
use grasp_common::{ObjectId, Ray, Subscription, rigid_inverse};
use grasp_scene::{NodeKind, Traverse};

use super::{Intersection, IntersectionStrategy};
use crate::{ConfigElement, Context, ManipError};

pub const ELEMENT: &str = "ray_intersection_strategy";
const REQUIRED_VERSION: u32 = 2;

/// Casts a ray along the wand's local −Z and keeps the nearest hit.
///
/// Each node is tested in its own frame. A ray that misses the box around
/// the node and all its descendants prunes the subtree; otherwise an
/// intersectable node is hit through its own box, or with
/// `triangle_intersect` set, through its own triangles.
pub struct RayIntersection {
    ray_length: f32,
    exact: bool,
    visible: bool,
    visibility: Option<Subscription<bool>>,
    visual: Option<(Vec3, Vec3)>,
}

impl Default for RayIntersection {
    fn default() -> Self {
        Self {
            ray_length: 6.0,
            exact: false,
            visible: true,
            visibility: None,
            visual: None,
        }
    }
}

impl RayIntersection {
    pub fn from_config(element: Option<&ConfigElement>) -> Result<Self, ManipError> {
        let Some(e) = element else {
            return Ok(Self::default());
        };
        e.require_version(REQUIRED_VERSION)?;
        let ray_length = e.float_or("ray_length", 6.0)?;
        if ray_length <= 0.0 {
            return Err(ManipError::config(ELEMENT, "ray_length must be positive"));
        }
        Ok(Self {
            ray_length,
            exact: e.bool_or("triangle_intersect", false)?,
            visible: e.bool_or("ray_visible", true)?,
            ..Self::default()
        })
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl IntersectionStrategy for RayIntersection {
    fn name(&self) -> &str {
        "RayIntersection"
    }

    fn init(&mut self, ctx: &Context<'_>) -> Result<(), ManipError> {
        self.visibility = Some(ctx.bus.ray_visibility.subscribe());
        tracing::debug!(length = self.ray_length, exact = self.exact, "ray intersection ready");
        Ok(())
    }

    fn update(&mut self, ctx: &Context<'_>) {
        if let Some(flag) = self.visibility.as_ref().and_then(|s| s.drain().pop()) {
            self.visible = flag;
        }
        self.visual = self.visible.then(|| {
            let ray = Ray::from_pose(&ctx.device.pose());
            (ray.origin, ray.at(self.ray_length))
        });
    }

    fn find_intersection(
        &self,
        ctx: &Context<'_>,
        candidates: &[ObjectId],
    ) -> Option<Intersection> {
        let world_ray = Ray::from_pose(&ctx.device.pose());
        let mut nearest: Option<(f32, ObjectId)> = None;

        ctx.scene.traverse(candidates, |id, obj| {
            let local_ray = world_ray.transformed(&rigid_inverse(&ctx.scene.world_transform(id)));
            let reachable = ctx
                .scene
                .subtree_bounds(id)
                .is_some_and(|b| b.intersect_ray(&local_ray).is_some());
            if !reachable {
                return Traverse::Skip;
            }
            if !obj.is_intersectable() || obj.kind() == NodeKind::Group {
                return Traverse::Continue;
            }
            let hit = if self.exact {
                obj.triangles()
                    .iter()
                    .filter_map(|t| t.intersect_ray(&local_ray))
                    .reduce(f32::min)
            } else {
                obj.bounds().ray_hit_distance(&local_ray)
            };
            if let Some(t) = hit {
                if nearest.is_none_or(|(best, _)| t < best) {
                    nearest = Some((t, id));
                }
            }
            Traverse::Continue
        });

        nearest.map(|(t, object)| Intersection {
            object,
            point: world_ray.at(t),
        })
    }

    fn visual_ray(&self) -> Option<(Vec3, Vec3)> {
        self.visual
    }
}
