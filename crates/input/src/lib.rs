//! Wand input: tracked pose, digital buttons with edge states, analog axes,
//! and the button-set matcher strategies use to read them.
//!
//! # Invariants
//! - Out-of-range device lookups never fail; they return a fixed dummy.
//! - A `CommandMatcher` is a pure function of the current frame's snapshot.

pub mod command;
pub mod device;

pub use command::CommandMatcher;
pub use device::{DeviceState, DigitalState, WandState};

/// Errors from device lookups and button-list parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("{kind} index {index} out of range (device has {len})")]
    InvalidIndex {
        kind: &'static str,
        index: i32,
        len: usize,
    },
    #[error("malformed button list {input:?}: {token:?} is not an integer")]
    MalformedButtonList { input: String, token: String },
}
