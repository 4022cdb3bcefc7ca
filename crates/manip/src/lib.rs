//! Wand-driven manipulation: intersection, grab and move strategies selected
//! by name from configuration, orchestrated once per frame by
//! [`ManipulationController`].
//!
//! # Invariants
//! - An object is in the grabbed set only between its grab and release
//!   callbacks; controller and strategy never disagree after `update`.
//! - Per-object move state is captured once at grab and erased at release.
//! - An object whose `grabbable` flag is cleared is released in the same
//!   frame, with a release callback, whether or not a button was pressed.
//! - A controller value exists only after every strategy initialised.

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod event;
pub mod grab;
pub mod isect;
pub mod movement;
pub mod registry;

#[cfg(test)]
mod testing;

pub use config::{ConfigElement, ManipulationConfig, PropertyValue};
pub use context::Context;
pub use controller::ManipulationController;
pub use error::ManipError;
pub use event::{EventBus, GrabAnswer, GrabSignalSlot, GrabSignals, IntersectionEvent, ObjectsMoved};
pub use grab::{GrabCallbacks, GrabStrategy};
pub use isect::{Intersection, IntersectionStrategy};
pub use movement::MoveStrategy;
pub use registry::{ApiVersion, StrategyInfo, StrategyKind, StrategyRegistry};
