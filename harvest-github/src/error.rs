//! Error types for GraphQL harvesting

use thiserror::Error;

use crate::retry::RetryPolicy;

/// Result type for harvesting operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the GraphQL API or shaping its data
#[derive(Error, Debug)]
pub enum Error {
    /// Network-level failure: connect, reset, timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Body was not a GraphQL response envelope, or carried no data
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The response carried a GraphQL `errors` array
    #[error("GraphQL errors ({}): {messages}", data_note(.partial))]
    GraphQl {
        messages: String,
        /// Whether `data` was present alongside the errors
        partial: bool,
    },

    /// Retry budget exhausted
    #[error("Query failed after {attempts} attempts: {last_error}")]
    FatalQuery {
        attempts: u32,
        last_error: Box<Error>,
    },

    /// The payload did not have the expected shape; never retried
    #[error("Unexpected response shape: {0}")]
    DataShape(String),

    /// Configuration or sink failure
    #[error(transparent)]
    Core(#[from] harvest_core::Error),
}

impl Error {
    /// Whether another attempt at the same request could succeed
    pub fn is_retryable(&self, policy: &RetryPolicy) -> bool {
        match self {
            Error::Transport(_) | Error::MalformedResponse(_) | Error::GraphQl { .. } => true,
            Error::HttpStatus { status, .. } => policy.retryable_statuses.contains(status),
            Error::FatalQuery { .. } | Error::DataShape(_) | Error::Core(_) => false,
        }
    }
}

fn data_note(partial: &bool) -> &'static str {
    if *partial {
        "partial data"
    } else {
        "no data"
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
