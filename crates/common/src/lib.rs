//! Shared types for the manipulation workspace.
//!
//! # Invariants
//! - Object handles are weak: holding an `ObjectId` never keeps an object alive.
//! - Transforms handed between crates are rigid (rotation + translation).

pub mod channel;
pub mod geometry;
pub mod types;

pub use channel::{Channel, Subscription};
pub use geometry::{Aabb, Ray, Triangle, rigid_inverse};
pub use types::{ObjectId, Transform};
