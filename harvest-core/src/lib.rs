//! Harvest Core - Core library for pull request harvesting
//!
//! This crate holds the pieces shared by the GraphQL harvester and the CLI:
//! configuration and secrets loading, the derived record model, and the
//! sinks that persist one batch of records per repository.

pub mod config;
pub mod error;
pub mod record;
pub mod secrets;
pub mod sink;

pub use config::{ApiConfig, Config, HarvestSettings, PartialErrorPolicy, RetrySettings};
pub use error::{Error, Result};
pub use record::{DerivedRecord, RepositoryId, ReviewState, RECORD_COLUMNS};
pub use secrets::{BearerToken, Secrets};
pub use sink::{CsvDirectorySink, ProcessedSet, RecordSink};
