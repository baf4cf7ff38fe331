//! Derived pull request records and repository identifiers

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::Error;

/// Column order of every record batch written downstream
pub const RECORD_COLUMNS: [&str; 16] = [
    "number",
    "title",
    "author",
    "createdAt",
    "closedOrMergedAt",
    "reviewsCount",
    "hoursOpen",
    "merged",
    "additions",
    "deletions",
    "changedFiles",
    "bodyLength",
    "issueCommentsCount",
    "reviewThreadsCount",
    "interactionsCount",
    "finalReviewState",
];

/// A repository addressed as `owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    /// Owning user or organization login
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepositoryId {
    /// Create a repository identifier
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Key used for the on-disk batch, `owner_name`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name.trim_end_matches(".git")))
            }
            _ => Err(Error::InvalidRepository(s.to_string())),
        }
    }
}

/// Outcome of the last submitted review, or a fallback when none is usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    /// Fallback: no timestamped review, pull request merged
    Merged,
    /// Fallback: no timestamped review, pull request closed unmerged
    Closed,
    /// A timestamped review without a state
    None,
    /// Any state the API adds later
    Other(String),
}

impl ReviewState {
    /// Map an API review state string
    pub fn from_api(state: &str) -> Self {
        match state {
            "APPROVED" => ReviewState::Approved,
            "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
            "COMMENTED" => ReviewState::Commented,
            "DISMISSED" => ReviewState::Dismissed,
            "PENDING" => ReviewState::Pending,
            "" => ReviewState::None,
            other => ReviewState::Other(other.to_string()),
        }
    }

    /// Fallback state derived from the pull request itself
    pub fn fallback(merged: bool) -> Self {
        if merged {
            ReviewState::Merged
        } else {
            ReviewState::Closed
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReviewState::Approved => "APPROVED",
            ReviewState::ChangesRequested => "CHANGES_REQUESTED",
            ReviewState::Commented => "COMMENTED",
            ReviewState::Dismissed => "DISMISSED",
            ReviewState::Pending => "PENDING",
            ReviewState::Merged => "MERGED",
            ReviewState::Closed => "CLOSED",
            ReviewState::None => "NONE",
            ReviewState::Other(s) => s,
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for ReviewState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One admitted pull request, ready for analysis
///
/// Only records with at least one review that stayed open for at least an
/// hour are ever constructed; see the extractor in `harvest-github`.
/// Field order matches [`RECORD_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedRecord {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub closed_or_merged_at: DateTime<Utc>,
    pub reviews_count: u64,
    pub hours_open: f64,
    pub merged: bool,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub body_length: usize,
    pub issue_comments_count: u64,
    pub review_threads_count: u64,
    pub interactions_count: u64,
    pub final_review_state: ReviewState,
}
