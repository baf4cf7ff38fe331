//! CLI command implementations

pub mod repo;
pub mod sweep;

pub use repo::RepoArgs;
pub use sweep::SweepArgs;
