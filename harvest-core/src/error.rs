//! Error types for pull request harvesting

use thiserror::Error;

/// Result type alias for harvest core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for harvest core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error while writing a record batch
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Repository identifier could not be parsed
    #[error("Invalid repository '{0}'. Expected owner/name")]
    InvalidRepository(String),
}
