//! Scene object store: the arena manipulation strategies address by handle.
//!
//! # Invariants
//! - All mutations go through `SceneStore` operations and are logged.
//! - Iteration order is deterministic (insertion order for roots and
//!   children, `BTreeMap` order for the arena).
//! - Removing a grabbable object announces `grabbable = false` first.

pub mod store;

pub use store::{
    GrabbableChanged, NodeKind, ObjectDesc, SceneEvent, SceneObject, SceneStore, Traverse,
};
