/// Convenience result type used across reelcache.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by reference, cache and driver APIs.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid caller-provided options or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// A value was accessed through a reference that has already been closed.
    #[error("closed reference: {0}")]
    Closed(String),

    /// Exclusive access was requested on a value that other references still share.
    #[error("shared reference: {0}")]
    Shared(String),

    /// A buffer could not be allocated.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// A frame renderer failed unexpectedly (as opposed to reporting an unrenderable frame).
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing options.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Closed`] value.
    pub fn closed(msg: impl Into<String>) -> Self {
        Self::Closed(msg.into())
    }

    /// Build a [`ReelError::Shared`] value.
    pub fn shared(msg: impl Into<String>) -> Self {
        Self::Shared(msg.into())
    }

    /// Build a [`ReelError::Allocation`] value.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build a [`ReelError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
