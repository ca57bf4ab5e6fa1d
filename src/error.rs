use thiserror::Error;

/// Unified error type for the sweep runtime.
///
/// Every failed call collapses into one of these categories, and
/// [`Error::is_retryable`] is the single authority on whether the batch layer
/// may re-dispatch the item or must abort the run.
#[derive(Debug, Error)]
pub enum Error {
    /// The whole call (request + response) ran past the per-call deadline.
    #[error("Call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: message.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether the failure is transient from the batch layer's point of view.
    ///
    /// Timeouts, transport faults, API rejections and unparseable payloads are
    /// all worth another round. Configuration problems poison every future
    /// attempt and must abort the run instead.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::Transport(_) | Error::Api { .. } | Error::Parse(_)
        )
    }
}
