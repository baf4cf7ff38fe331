//! Cursor-based pagination over GraphQL connections
//!
//! A [`PageWalker`] owns the cursor for one connection and fetches exactly
//! one page per [`GraphQlClient::execute`] call. It never retries on its
//! own; a failed page ends the walk by returning the error.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::GraphQlClient;
use crate::{Error, Result};

/// Pagination block of a connection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Where a walker stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    /// Next request uses this cursor (`None` for the first page)
    HasCursor(Option<String>),
    /// The connection has no more pages
    Exhausted,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConnection {
    nodes: Option<Vec<Value>>,
    edges: Option<Vec<RawEdge>>,
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    #[serde(default)]
    node: Value,
}

/// Find the connection object inside `data` by following `path`
fn connection_at<'v>(data: &'v Value, path: &[&str]) -> Result<&'v Value> {
    let mut current = data;
    for key in path {
        current = match current.get(key) {
            Some(Value::Null) | None => {
                return Err(Error::DataShape(format!(
                    "missing `{}` in response data",
                    path.join(".")
                )))
            }
            Some(value) => value,
        };
    }
    Ok(current)
}

/// Flatten `nodes` or `edges[].node` into one list; null entries are dropped
fn flatten_nodes(raw: RawConnection, path: &[&str]) -> Result<(Vec<Value>, PageInfo)> {
    let page_info = raw.page_info.ok_or_else(|| {
        Error::DataShape(format!("connection `{}` has no pageInfo", path.join(".")))
    })?;

    let nodes: Vec<Value> = match (raw.nodes, raw.edges) {
        (Some(nodes), _) => nodes,
        (None, Some(edges)) => edges.into_iter().map(|edge| edge.node).collect(),
        (None, None) => {
            return Err(Error::DataShape(format!(
                "connection `{}` has neither nodes nor edges",
                path.join(".")
            )))
        }
    };

    Ok((nodes.into_iter().filter(|n| !n.is_null()).collect(), page_info))
}

/// Walks a connection page by page, yielding typed nodes
pub struct PageWalker<'a, T> {
    client: &'a GraphQlClient,
    query: &'a str,
    variables: Map<String, Value>,
    path: &'a [&'a str],
    state: CursorState,
    pages: usize,
    _node: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> PageWalker<'a, T> {
    /// Start at the first page
    ///
    /// `path` locates the connection inside `data`, e.g.
    /// `["repository", "pullRequests"]`. The walker owns the `after`
    /// variable; any value passed in `variables` is overwritten.
    pub fn new(client: &'a GraphQlClient, query: &'a str, variables: Value, path: &'a [&'a str]) -> Self {
        let variables = match variables {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            client,
            query,
            variables,
            path,
            state: CursorState::HasCursor(None),
            pages: 0,
            _node: PhantomData,
        }
    }

    /// Resume from a cursor obtained in an earlier walk
    pub fn starting_after(mut self, cursor: impl Into<String>) -> Self {
        self.state = CursorState::HasCursor(Some(cursor.into()));
        self
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Fetch the next page, or `None` once the connection is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let cursor = match &self.state {
            CursorState::Exhausted => return Ok(None),
            CursorState::HasCursor(cursor) => cursor.clone(),
        };

        self.variables.insert(
            "after".to_string(),
            cursor.clone().map(Value::String).unwrap_or(Value::Null),
        );
        let data = self
            .client
            .execute(self.query, &Value::Object(self.variables.clone()))
            .await?;

        let connection = connection_at(&data, self.path)?;
        let raw = RawConnection::deserialize(connection)
            .map_err(|e| Error::DataShape(format!("connection `{}`: {}", self.path.join("."), e)))?;
        let (nodes, page_info) = flatten_nodes(raw, self.path)?;

        let typed = nodes
            .into_iter()
            .map(serde_json::from_value::<T>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::DataShape(format!("node in `{}`: {}", self.path.join("."), e)))?;

        self.pages += 1;
        self.state = match (page_info.has_next_page, page_info.end_cursor) {
            (false, _) => CursorState::Exhausted,
            (true, Some(next)) if cursor.as_deref() == Some(next.as_str()) => {
                return Err(Error::DataShape(format!(
                    "connection `{}` returned the same endCursor `{}` twice",
                    self.path.join("."),
                    next
                )))
            }
            (true, Some(next)) => CursorState::HasCursor(Some(next)),
            (true, None) => {
                return Err(Error::DataShape(format!(
                    "connection `{}` reports another page without an endCursor",
                    self.path.join(".")
                )))
            }
        };

        debug!(
            connection = %self.path.join("."),
            page = self.pages,
            nodes = typed.len(),
            exhausted = self.is_exhausted(),
            "Fetched page"
        );
        Ok(Some(typed))
    }
}
