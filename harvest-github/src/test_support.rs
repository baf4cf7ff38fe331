//! Shared fixtures for tests: a recording sleeper, a client wired to a mock
//! server, and a responder that serves a fixed connection page by page.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use harvest_core::BearerToken;
use serde_json::{json, Map, Value};
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

use crate::client::GraphQlClient;
use crate::retry::{RetryPolicy, Sleeper};

/// Sleeper that records requested delays and returns immediately
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

pub(crate) fn client_for(
    server: &MockServer,
    policy: RetryPolicy,
    sleeper: Arc<RecordingSleeper>,
) -> GraphQlClient {
    client_with_timeout(server, policy, sleeper, Duration::from_secs(5))
}

pub(crate) fn client_with_timeout(
    server: &MockServer,
    policy: RetryPolicy,
    sleeper: Arc<RecordingSleeper>,
    request_timeout: Duration,
) -> GraphQlClient {
    let endpoint = format!("{}/graphql", server.uri()).parse().unwrap();
    GraphQlClient::new(
        endpoint,
        BearerToken::new("ghp_test"),
        policy,
        request_timeout,
        "pr-harvest-tests",
    )
    .unwrap()
    .with_sleeper(sleeper)
}

/// Serves `items` as a connection at `path`, honouring `first` / `after`
/// variables. Cursors look like `cursor-<offset>`.
pub(crate) struct ConnectionResponder {
    path: Vec<&'static str>,
    items: Vec<Value>,
    edges: bool,
}

impl ConnectionResponder {
    pub(crate) fn new(path: &[&'static str], items: Vec<Value>) -> Self {
        Self {
            path: path.to_vec(),
            items,
            edges: false,
        }
    }

    /// `total` pull request stubs `{number: i}` as a flat node list
    pub(crate) fn nodes(total: u64) -> Self {
        let items = (0..total).map(|i| json!({ "number": i })).collect();
        Self::new(&["repository", "pullRequests"], items)
    }

    /// Same stubs wrapped in edges
    pub(crate) fn edges(total: u64) -> Self {
        Self {
            edges: true,
            ..Self::nodes(total)
        }
    }

    pub(crate) fn with_edges(mut self) -> Self {
        self.edges = true;
        self
    }
}

impl Respond for ConnectionResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = request.body_json().unwrap_or(Value::Null);
        let variables = &body["variables"];
        let first = variables["first"].as_u64().unwrap_or(100) as usize;
        let start = variables["after"]
            .as_str()
            .and_then(|c| c.strip_prefix("cursor-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0)
            .min(self.items.len());
        let end = (start + first).min(self.items.len());
        let page: Vec<Value> = self.items[start..end].to_vec();

        let mut connection = Map::new();
        if self.edges {
            let edges = page.into_iter().map(|node| json!({ "node": node })).collect();
            connection.insert("edges".to_string(), Value::Array(edges));
        } else {
            connection.insert("nodes".to_string(), Value::Array(page));
        }
        connection.insert(
            "pageInfo".to_string(),
            json!({ "hasNextPage": end < self.items.len(), "endCursor": format!("cursor-{end}") }),
        );

        let mut value = Value::Object(connection);
        for key in self.path.iter().rev() {
            let mut wrapper = Map::new();
            wrapper.insert((*key).to_string(), value);
            value = Value::Object(wrapper);
        }

        ResponseTemplate::new(200).set_body_json(json!({ "data": value }))
    }
}

/// A pull request that passes every filter: merged after 2 hours, one
/// approving review
pub(crate) fn reviewed_pr(number: u64) -> Value {
    json!({
        "number": number,
        "title": format!("PR {number}"),
        "author": { "login": "octocat" },
        "createdAt": "2024-03-01T10:00:00Z",
        "mergedAt": "2024-03-01T12:00:00Z",
        "closedAt": "2024-03-01T12:00:00Z",
        "additions": 12,
        "deletions": 4,
        "changedFiles": 2,
        "bodyText": "Fixes a bug",
        "comments": { "totalCount": 1 },
        "reviewThreads": { "totalCount": 2 },
        "reviews": {
            "totalCount": 1,
            "nodes": [{ "state": "APPROVED", "submittedAt": "2024-03-01T11:00:00Z" }]
        },
        "merged": true
    })
}

/// A repository search node
pub(crate) fn repository_node(owner: &str, name: &str, pull_requests: u64) -> Value {
    json!({
        "owner": { "login": owner },
        "name": name,
        "pullRequests": { "totalCount": pull_requests }
    })
}
