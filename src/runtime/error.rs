use thiserror::Error;

use crate::ir::CallableKind;

/// Faults raised while loading modules or resolving from a container.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A Binding reached its first resolution with no scope chosen.
    #[error("Binding for '{ty}' has no scope; call as_singleton() or as_transient()")]
    Configuration { ty: String },

    #[error("No binding found for '{ty}' or any of its supertypes")]
    NotFound { ty: String },

    /// No registered factory and no fallback able to build the type.
    #[error("Cannot construct '{ty}': {reason}")]
    Unsupported { ty: String, reason: String },

    #[error("Resolved instance of '{actual}' is not a '{requested}'")]
    Cast { requested: String, actual: String },

    #[error("Duplicate {kind} registration for '{ty}'")]
    DuplicateRegistration { ty: String, kind: CallableKind },

    #[error("Execution error: {msg}")]
    Execution { msg: String },

    #[error("Cannot load module '{module}': {msg}")]
    Load { module: String, msg: String },
}

impl RuntimeError {
    pub fn not_found(ty: impl Into<String>) -> Self {
        Self::NotFound { ty: ty.into() }
    }

    pub fn unsupported(ty: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported { ty: ty.into(), reason: reason.into() }
    }

    pub fn cast(requested: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Cast { requested: requested.into(), actual: actual.into() }
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution { msg: msg.into() }
    }

    pub fn load(module: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Load { module: module.into(), msg: msg.into() }
    }

    /// Faults that `try_resolve`/`try_inject` turn into a negative result.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RuntimeError::NotFound { .. } | RuntimeError::Cast { .. })
    }
}
