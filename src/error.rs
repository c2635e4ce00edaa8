use std::{path::PathBuf, sync::Arc};

use reqwest::StatusCode;

/// Represents a result type for operations in the SPACE client.
///
/// This `Result` type is a standard Rust `Result` type where the error variant is defined by the
/// client-specific [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur while talking to SPACE.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A local precondition was violated. Raised before any request is sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A local file that should be uploaded does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The server answered with a non-2xx status.
    #[error("SPACE responded with {status}: {body}")]
    Remote {
        /// HTTP status returned by the server.
        status: StatusCode,
        /// Raw response body, usually a JSON error document.
        body: String,
    },

    /// No response was received (connection refused, DNS failure, timeout, ...).
    #[error(transparent)]
    Transport(Arc<reqwest::Error>),

    /// The request was cancelled because the session was closed while it was in flight.
    #[error("request cancelled")]
    Cancelled,

    /// The server answered with 2xx but the body could not be decoded.
    #[error("invalid response body")]
    InvalidResponse(#[source] Arc<serde_json::Error>),

    /// An I/O error while reading a local file.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Invalid base URL configuration.
    #[error("invalid url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Error {
        Error::InvalidArgument(message.into())
    }

    /// HTTP status of a [`Error::Remote`] error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            Error::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// Returns `true` if the server answered with `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Returns `true` if the request timed out before a response was received.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(err) if err.is_timeout())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Transport(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::InvalidResponse(Arc::new(value))
    }
}
