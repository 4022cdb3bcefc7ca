use grasp_input::InputError;

use crate::registry::{ApiVersion, StrategyKind};

/// Errors raised while building and initialising manipulation strategies.
///
/// Nothing in the per-frame path returns these.
#[derive(Debug, thiserror::Error)]
pub enum ManipError {
    #[error("configuration error in {element}: {message}")]
    Configuration { element: String, message: String },
    #[error("{kind} strategy {name:?} targets API {found}, host expects {expected}")]
    InterfaceVersion {
        kind: StrategyKind,
        name: String,
        found: ApiVersion,
        expected: ApiVersion,
    },
    #[error("unknown {kind} strategy {name:?}")]
    UnknownStrategy { kind: StrategyKind, name: String },
    #[error(transparent)]
    Input(#[from] InputError),
}

impl ManipError {
    pub fn config(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            element: element.into(),
            message: message.into(),
        }
    }
}
