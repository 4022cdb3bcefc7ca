//! Developer tooling: read-only inspectors for the scene store and the
//! manipulation controller.
//!
//! # Invariants
//! - Inspectors never mutate what they look at.

pub mod inspector;

pub use inspector::{ControllerSummary, ObjectInfo, SceneInspector, SceneSummary};
