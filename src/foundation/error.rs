/// Convenience result type used across framescrub.
pub type ScrubResult<T> = Result<T, ScrubError>;

/// Top-level error taxonomy used by framescrub APIs.
///
/// The scheduler never surfaces these to the playback side: per-frame fetch and decode failures are
/// logged and folded into scheduler state. Errors reach callers only from construction, IO helpers
/// and the CLI.
#[derive(thiserror::Error, Debug)]
pub enum ScrubError {
    /// Invalid user-provided configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport failure or non-success response while retrieving a frame.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Frame bytes could not be decoded into an image.
    #[error("decode error: {0}")]
    Decode(String),

    /// The fetch worker is gone or refused a request.
    #[error("worker error: {0}")]
    Worker(String),

    /// Errors when serializing or deserializing configuration or wire messages.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrubError {
    /// Build a [`ScrubError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ScrubError::Fetch`] value.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Build a [`ScrubError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`ScrubError::Worker`] value.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }

    /// Build a [`ScrubError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
