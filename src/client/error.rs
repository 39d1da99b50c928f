//! Client-specific error types.

use thiserror::Error;

/// Result type for remote calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur talking to the semantic layer API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to build the HTTP client or a request.
    #[error("failed to build request: {0}")]
    Build(String),

    /// The request did not complete.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Failed to deserialize a response.
    #[error("failed to deserialize response: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// The API reported an error for the request.
    #[error("{0}")]
    Remote(String),

    /// The server kept answering "Continue wait".
    #[error("query still running after {0} attempts")]
    ContinueWaitExhausted(u32),
}

impl ClientError {
    /// Check if retrying the same request may succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::ContinueWaitExhausted(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}
