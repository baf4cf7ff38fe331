//! GraphQL client with bounded, jittered retries
//!
//! Every request is a POST of `{query, variables}`. Transient failures
//! (transport errors, retryable statuses, malformed bodies, GraphQL `errors`)
//! are retried until the policy's attempt budget runs out; anything else is
//! returned straight away.

use std::sync::Arc;
use std::time::Duration;

use harvest_core::{BearerToken, Config, PartialErrorPolicy};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};
use url::Url;

use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::{Error, Result};

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

/// GraphQL API client owning its retry configuration
pub struct GraphQlClient {
    http: reqwest::Client,
    endpoint: Url,
    token: Option<BearerToken>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl GraphQlClient {
    /// Create a client for an endpoint
    ///
    /// Without a token requests go out unauthenticated; GitHub will reject
    /// them, but deciding whether that is fatal is left to the caller.
    pub fn new(
        endpoint: Url,
        token: Option<BearerToken>,
        policy: RetryPolicy,
        request_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;

        if token.is_none() {
            warn!(endpoint = %endpoint, "No GitHub token configured, sending unauthenticated requests");
        }

        Ok(Self {
            http,
            endpoint,
            token,
            policy,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: &Config, token: Option<BearerToken>) -> Result<Self> {
        Self::new(
            config.api.endpoint_url()?,
            token,
            RetryPolicy::from_settings(&config.retry),
            config.api.request_timeout,
            &config.api.user_agent,
        )
    }

    /// Replace the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Execute a query and return its `data` object
    ///
    /// Returns [`Error::FatalQuery`] once the attempt budget is spent, or the
    /// first non-retryable error unchanged.
    pub async fn execute(&self, query: &str, variables: &Value) -> Result<Value> {
        let budget = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.attempt(query, variables).await {
                Ok(data) => return Ok(data),
                Err(err) => err,
            };

            if !err.is_retryable(&self.policy) {
                error!(attempt, budget, cause = %err, "GraphQL request failed permanently");
                return Err(err);
            }

            if attempt >= budget {
                error!(attempt, budget, cause = %err, "GraphQL retry budget exhausted");
                return Err(Error::FatalQuery {
                    attempts: attempt,
                    last_error: Box::new(err),
                });
            }

            let delay = self.policy.delay_for(attempt - 1);
            warn!(
                attempt,
                budget,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                cause = %err,
                "GraphQL request failed, retrying"
            );
            self.sleeper.sleep(delay).await;
        }
    }

    /// One HTTP round trip, classified
    async fn attempt(&self, query: &str, variables: &Value) -> Result<Value> {
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: summarize_body(&body),
            });
        }

        let envelope: GraphQlResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("invalid JSON body: {}", e)))?;
        let errors = envelope.errors.unwrap_or_default();
        let messages = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        match (envelope.data, errors.is_empty()) {
            (Some(data), true) => {
                debug!(status = status.as_u16(), "GraphQL request succeeded");
                Ok(data)
            }
            (Some(data), false) => match self.policy.partial_errors {
                PartialErrorPolicy::Accept => {
                    warn!(errors = %messages, "Accepting GraphQL response with partial errors");
                    Ok(data)
                }
                PartialErrorPolicy::Retry => Err(Error::GraphQl {
                    messages,
                    partial: true,
                }),
            },
            (None, false) => Err(Error::GraphQl {
                messages,
                partial: false,
            }),
            (None, true) => Err(Error::MalformedResponse(
                "response has neither data nor errors".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for GraphQlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQlClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.token.is_some())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Shorten an error body for logs; HTML error pages collapse to their title
fn summarize_body(body: &str) -> String {
    const MAX_CHARS: usize = 200;

    if let Some((_, rest)) = body.split_once("<title>") {
        if let Some((title, _)) = rest.split_once("</title>") {
            return format!("{} (HTML)", title.trim());
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_CHARS {
        let head: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}
