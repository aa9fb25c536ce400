use thiserror::Error;

use crate::session::{PageError, SessionError};

/// Broad classes of extraction failure. Callers decide whether to continue a
/// batch from the kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Navigation,
    ExtractionUnavailable,
    SessionStartup,
    Sanitization,
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("navigation timed out after {0}ms")]
    NavigationTimeout(u64),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("readable content unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("sanitization failed: {0}")]
    Sanitization(String),
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) | Self::NavigationTimeout(_) | Self::Navigation(_) => {
                ErrorKind::Navigation
            }
            Self::ExtractionUnavailable(_) => ErrorKind::ExtractionUnavailable,
            Self::Session(err) if err.is_fatal() => ErrorKind::SessionStartup,
            // A single context that would not open is a per-URL problem
            Self::Session(_) => ErrorKind::Navigation,
            Self::Sanitization(_) => ErrorKind::Sanitization,
        }
    }

    /// Whether the batch has to stop: nothing later can succeed.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::SessionStartup
    }
}

impl From<PageError> for ExtractError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Navigation(msg) => Self::Navigation(msg),
            PageError::Evaluation(msg) | PageError::Content(msg) => {
                Self::ExtractionUnavailable(msg)
            }
            PageError::Closed => Self::Navigation("page already closed".to_string()),
            PageError::Close(msg) => Self::Navigation(msg),
        }
    }
}
