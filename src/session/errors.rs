use thiserror::Error;

/// Failures of the browser process or of opening a page context in it.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("browser failed to launch: {0}")]
    Launch(String),

    #[error("could not open page context: {0}")]
    PageContext(String),

    #[error("browser connection lost: {0}")]
    Disconnected(String),

    #[error("browser did not close cleanly: {0}")]
    Close(String),
}

impl SessionError {
    /// Whether the error leaves the session unusable for every later URL.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Launch(_) => true,
            Self::Disconnected(_) => true,

            Self::PageContext(_) => false,
            Self::Close(_) => false,
        }
    }
}

/// Failures raised by a single page context.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    #[error("page content unavailable: {0}")]
    Content(String),

    #[error("page already closed")]
    Closed,

    #[error("page close failed: {0}")]
    Close(String),
}
