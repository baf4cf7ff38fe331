//! Typed GraphQL nodes and their normalized form
//!
//! Pull request nodes arrive with most fields optional or nullable. They are
//! deserialized as-is and then normalized once into [`PullRequestFacts`], so
//! the extractor never has to deal with missing values.

use chrono::{DateTime, Utc};
use harvest_core::RepositoryId;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Actor {
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNode {
    pub state: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewConnection {
    #[serde(default)]
    pub total_count: u64,
    pub nodes: Option<Vec<Option<ReviewNode>>>,
}

/// Pull request node as returned by the pull request query
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub number: u64,
    pub title: Option<String>,
    pub author: Option<Actor>,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub changed_files: Option<u64>,
    pub body_text: Option<String>,
    pub comments: Option<TotalCount>,
    pub review_threads: Option<TotalCount>,
    pub reviews: Option<ReviewConnection>,
    pub merged: Option<bool>,
}

/// One review reduced to what ordering needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub state: Option<String>,
    /// `submittedAt`, falling back to `createdAt`
    pub timestamp: Option<DateTime<Utc>>,
}

/// A pull request with every default applied
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestFacts {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub body_length: usize,
    pub issue_comments: u64,
    pub review_threads: u64,
    pub reviews_count: u64,
    pub reviews: Vec<ReviewEntry>,
    pub merged: bool,
}

impl From<PullRequestNode> for PullRequestFacts {
    fn from(node: PullRequestNode) -> Self {
        let reviews = node.reviews.unwrap_or_default();
        let entries = reviews
            .nodes
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|review| ReviewEntry {
                state: review.state,
                timestamp: review.submitted_at.or(review.created_at),
            })
            .collect();

        PullRequestFacts {
            number: node.number,
            title: node.title.unwrap_or_default(),
            author: node
                .author
                .and_then(|a| a.login)
                .unwrap_or_else(|| "unknown".to_string()),
            created_at: node.created_at,
            merged_at: node.merged_at,
            closed_at: node.closed_at,
            additions: node.additions.unwrap_or(0),
            deletions: node.deletions.unwrap_or(0),
            changed_files: node.changed_files.unwrap_or(0),
            body_length: node.body_text.map(|b| b.chars().count()).unwrap_or(0),
            issue_comments: node.comments.unwrap_or_default().total_count,
            review_threads: node.review_threads.unwrap_or_default().total_count,
            reviews_count: reviews.total_count,
            reviews: entries,
            merged: node.merged.unwrap_or(false),
        }
    }
}

/// Repository node from the search query
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub owner: Actor,
    pub name: String,
    #[serde(default)]
    pub pull_requests: TotalCount,
}

impl RepositoryNode {
    /// Identifier, or `None` when the owner login is missing
    pub fn id(&self) -> Option<RepositoryId> {
        self.owner
            .login
            .as_deref()
            .map(|owner| RepositoryId::new(owner, self.name.as_str()))
    }

    pub fn pull_request_count(&self) -> u64 {
        self.pull_requests.total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sparse_node_gets_defaults() {
        let node: PullRequestNode = serde_json::from_value(json!({
            "number": 3,
            "title": null,
            "author": null,
            "createdAt": "2024-01-01T00:00:00Z",
            "closedAt": "2024-01-02T00:00:00Z",
            "additions": null,
            "reviews": { "totalCount": 2, "nodes": null }
        }))
        .unwrap();

        let facts = PullRequestFacts::from(node);
        assert_eq!(facts.title, "");
        assert_eq!(facts.author, "unknown");
        assert_eq!(facts.additions, 0);
        assert_eq!(facts.deletions, 0);
        assert_eq!(facts.changed_files, 0);
        assert_eq!(facts.body_length, 0);
        assert_eq!(facts.issue_comments, 0);
        assert_eq!(facts.review_threads, 0);
        assert_eq!(facts.reviews_count, 2);
        assert!(facts.reviews.is_empty());
        assert!(facts.merged_at.is_none());
        assert!(!facts.merged);
    }

    #[test]
    fn test_review_timestamp_prefers_submitted_at() {
        let node: PullRequestNode = serde_json::from_value(json!({
            "number": 1,
            "createdAt": "2024-01-01T00:00:00Z",
            "bodyText": "héllo",
            "reviews": { "totalCount": 3, "nodes": [
                { "state": "COMMENTED", "submittedAt": "2024-01-01T05:00:00Z", "createdAt": "2024-01-01T04:00:00Z" },
                { "state": "APPROVED", "createdAt": "2024-01-01T06:00:00Z" },
                null
            ] }
        }))
        .unwrap();

        let facts = PullRequestFacts::from(node);
        // character count, not bytes
        assert_eq!(facts.body_length, 5);
        assert_eq!(facts.reviews.len(), 2);
        assert_eq!(
            facts.reviews[0].timestamp.unwrap().to_rfc3339(),
            "2024-01-01T05:00:00+00:00"
        );
        assert_eq!(
            facts.reviews[1].timestamp.unwrap().to_rfc3339(),
            "2024-01-01T06:00:00+00:00"
        );
    }

    #[test]
    fn test_repository_node() {
        let node: RepositoryNode = serde_json::from_value(json!({
            "owner": { "login": "rust-lang" },
            "name": "cargo",
            "pullRequests": { "totalCount": 1234 }
        }))
        .unwrap();
        assert_eq!(node.id().unwrap().to_string(), "rust-lang/cargo");
        assert_eq!(node.pull_request_count(), 1234);
    }
}
