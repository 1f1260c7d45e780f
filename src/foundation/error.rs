/// Convenience result type used across the crate.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error type for fallible steps inside the bridge and for configuration loading.
///
/// Bridge operations that the painting client calls never surface the recoverable variants
/// (`Allocation`, `ContextLost`); they are turned into state transitions and observer events.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// Invalid configuration or argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// A surface or texture could not be allocated.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// The GPU context became unusable.
    #[error("gpu context lost: {0}")]
    ContextLost(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Any other error with preserved source.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    /// Build a [`BridgeError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BridgeError::Allocation`].
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build a [`BridgeError::ContextLost`].
    pub fn context_lost(msg: impl Into<String>) -> Self {
        Self::ContextLost(msg.into())
    }

    /// Build a [`BridgeError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether this error means the GPU context is gone.
    pub fn is_context_lost(&self) -> bool {
        matches!(self, Self::ContextLost(_))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
