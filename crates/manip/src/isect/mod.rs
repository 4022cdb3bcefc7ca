//! Intersection strategies: which candidate object the wand is pointing at.

pub(crate) mod point;
pub(crate) mod ray;

pub use point::PointIntersection;
pub use ray::RayIntersection;

use glam::Vec3;
use grasp_common::ObjectId;

use crate::{Context, ManipError};

/// Nearest hit found by an intersection strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub object: ObjectId,
    /// Hit point in world coordinates.
    pub point: Vec3,
}

pub trait IntersectionStrategy {
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &Context<'_>) -> Result<(), ManipError> {
        Ok(())
    }

    /// Per-frame bookkeeping, called before `find_intersection`.
    fn update(&mut self, _ctx: &Context<'_>) {}

    /// Search the subtrees rooted at `candidates`. No candidates or no hit
    /// is `None`, never an error.
    fn find_intersection(&self, ctx: &Context<'_>, candidates: &[ObjectId])
    -> Option<Intersection>;

    /// World-space start and end of the visual ray, if one is shown.
    fn visual_ray(&self) -> Option<(Vec3, Vec3)> {
        None
    }
}
