//! Move strategies: the new local transform of each grabbed object, every
//! frame.
//!
//! All transforms are local to the object's parent unless named otherwise.
//! Wand and parent-to-world transforms are assumed rigid; a root object's
//! parent-to-world transform is identity.

pub(crate) mod basic;
pub(crate) mod center_point;
pub(crate) mod object_space;
pub(crate) mod slide;

pub use basic::BasicMove;
pub use center_point::CenterPointMove;
pub use object_space::ObjectSpaceMove;
pub use slide::SimpleSlideMove;

use glam::{Mat4, Vec3};
use grasp_common::ObjectId;

use crate::{Context, ManipError};

pub trait MoveStrategy {
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &Context<'_>) -> Result<(), ManipError> {
        Ok(())
    }

    /// Capture per-object state at the instant of grab.
    fn objects_grabbed(
        &mut self,
        ctx: &Context<'_>,
        objects: &[ObjectId],
        point: Vec3,
        wand: Mat4,
    );

    /// Erase all per-object state for `objects`.
    fn objects_released(&mut self, ctx: &Context<'_>, objects: &[ObjectId]);

    /// New local transform for `object`. `previous` is the running value of
    /// the move chain for this frame.
    fn compute_move(
        &mut self,
        ctx: &Context<'_>,
        object: ObjectId,
        wand: Mat4,
        previous: Mat4,
    ) -> Mat4;

    /// Number of objects with cached state.
    fn tracked(&self) -> usize;
}
