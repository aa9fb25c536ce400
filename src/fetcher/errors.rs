use reqwest::StatusCode;
use thiserror::Error;

/// Failure downloading a text resource.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("could not build http client: {0}")]
    Client(String),

    #[error("could not connect: {0}")]
    Connect(String),

    #[error("timed out connecting")]
    ConnectTimeout,

    #[error("timed out waiting for response")]
    RequestTimeout,

    #[error("redirect limit exceeded")]
    RedirectLoop,

    #[error("server answered {status}")]
    Http { status: StatusCode, retriable: bool },

    #[error("resource is {0} bytes, over the download limit")]
    BodyTooLarge(u64),

    #[error("resource is not utf-8 text")]
    InvalidUtf8,

    #[error("reading body: {0}")]
    Io(String),

    #[error("{0}")]
    Unknown(String),
}

impl FetchError {
    pub fn http(status: StatusCode) -> Self {
        Self::Http {
            status,
            retriable: status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Whether repeating the same request could succeed.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Http { retriable, .. } => *retriable,
            Self::Connect(_)
            | Self::ConnectTimeout
            | Self::RequestTimeout
            | Self::RedirectLoop
            | Self::Io(_)
            | Self::Unknown(_) => true,
            Self::InvalidUrl(_) | Self::Client(_) | Self::BodyTooLarge(_) | Self::InvalidUtf8 => {
                false
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return if err.is_connect() {
                Self::ConnectTimeout
            } else {
                Self::RequestTimeout
            };
        }
        if err.is_redirect() {
            return Self::RedirectLoop;
        }
        match err.status() {
            Some(status) => Self::http(status),
            None if err.is_connect() || err.is_request() => Self::Connect(err.to_string()),
            None if err.is_body() || err.is_decode() => Self::Io(err.to_string()),
            None => Self::Unknown(err.to_string()),
        }
    }
}
