/// Convenience result type used across framestack.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Top-level error taxonomy used by timeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum TimelineError {
    /// A frame was requested while the timeline was not open (or after it was closed).
    #[error("reader closed: {0}")]
    ReaderClosed(String),

    /// An operation referenced a clip that is not (or is already) registered.
    #[error("invalid clip: {0}")]
    InvalidClip(String),

    /// A clip could not acquire its decode resources.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),

    /// Invalid user-provided construction or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A clip failed to produce a decoded frame.
    #[error("decode error: {0}")]
    Decode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimelineError {
    /// Build a [`TimelineError::ReaderClosed`] value.
    pub fn reader_closed(msg: impl Into<String>) -> Self {
        Self::ReaderClosed(msg.into())
    }

    /// Build a [`TimelineError::InvalidClip`] value.
    pub fn invalid_clip(msg: impl Into<String>) -> Self {
        Self::InvalidClip(msg.into())
    }

    /// Build a [`TimelineError::ResourceExhaustion`] value.
    pub fn resource_exhaustion(msg: impl Into<String>) -> Self {
        Self::ResourceExhaustion(msg.into())
    }

    /// Build a [`TimelineError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TimelineError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// `true` for [`TimelineError::ReaderClosed`].
    pub fn is_reader_closed(&self) -> bool {
        matches!(self, Self::ReaderClosed(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
