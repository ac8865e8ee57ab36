use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the adapter and its transport.
#[derive(Error, Debug)]
pub enum Error {
    /// Neither the requested nor the default model id is in the catalog.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// No transport has been installed yet (missing credentials).
    #[error("adapter not ready: no credentials or transport configured")]
    NotReady,

    /// A transport was already installed on this adapter.
    #[error("adapter already initialized")]
    AlreadyInitialized,

    /// The caller cancelled the request before it was opened.
    #[error("request cancelled")]
    Cancelled,

    /// Rate limited by the endpoint. Check `retry_after` for suggested wait time.
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Invalid or missing API key.
    #[error("unauthorized")]
    Unauthorized,

    /// Server error (5xx status codes).
    #[error("server error ({0})")]
    Server(u16),

    /// API error with the endpoint's message.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// JSON or SSE parsing error.
    #[error("parse: {0}")]
    Parse(String),

    /// HTTP/network error.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration.
    #[error("config: {0}")]
    Config(String),

    /// Cost could not be computed from the model's pricing.
    #[error("cost: {0}")]
    Cost(String),
}

impl Error {
    /// Returns true if a caller could reasonably retry the request.
    ///
    /// The adapter itself never retries.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited { .. } | Error::Server(_) => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Create an API error from status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
