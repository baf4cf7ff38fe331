//! Harvest GitHub - GraphQL harvesting engine
//!
//! This crate turns GitHub's paginated GraphQL API into per-repository batches
//! of [`DerivedRecord`](harvest_core::DerivedRecord)s:
//! - [`GraphQlClient`] issues one query with bounded, jittered retries
//! - [`PageWalker`] follows connection cursors one page at a time
//! - [`extract`] filters and derives records from pull request nodes
//! - [`HarvestCoordinator`] drives single-repository and sweep runs

mod client;
mod coordinator;
mod error;
mod extract;
mod nodes;
mod pagination;
pub mod queries;
mod retry;
#[cfg(test)]
mod test_support;

pub use client::GraphQlClient;
pub use coordinator::{HarvestCoordinator, RepositoryHarvest, SweepSummary};
pub use error::{Error, Result};
pub use extract::{extract, final_review_state, MIN_OPEN_SECONDS};
pub use nodes::{PullRequestFacts, PullRequestNode, RepositoryNode, ReviewEntry};
pub use pagination::{CursorState, PageInfo, PageWalker};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
