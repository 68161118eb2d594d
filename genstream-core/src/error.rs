use thiserror::Error;

/// Core error type for genstream.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
#[derive(Debug, Error)]
pub enum GenStreamError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backend could not be reached at all (connect failure, DNS, ...).
    #[error("backend unreachable")]
    Unreachable,

    /// The backend answered with a non-success status.
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// The connection dropped while a response body was still streaming.
    #[error("connection interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CoreResult<T> = std::result::Result<T, GenStreamError>;
