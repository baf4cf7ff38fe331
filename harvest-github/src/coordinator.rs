//! Harvest coordination for single repositories and popular-repository sweeps
//!
//! Everything runs on one logical worker: pages, retries and repositories
//! are strictly sequential. A [`CancellationToken`] is honoured between
//! pages and between repositories, never mid-request.

use std::collections::HashSet;

use harvest_core::{DerivedRecord, HarvestSettings, RecordSink, RepositoryId};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::GraphQlClient;
use crate::extract::extract;
use crate::nodes::{PullRequestNode, RepositoryNode};
use crate::pagination::PageWalker;
use crate::queries;
use crate::{Error, Result};

/// Records harvested from one repository, in page-delivery order
#[derive(Debug, Clone)]
pub struct RepositoryHarvest {
    pub repository: RepositoryId,
    pub records: Vec<DerivedRecord>,
    /// Pull request pages fetched
    pub pages: usize,
    /// Pull request nodes inspected, admitted or not
    pub nodes_seen: usize,
    /// Stopped early because the record limit was reached
    pub reached_limit: bool,
    /// Stopped early because cancellation was requested
    pub cancelled: bool,
}

impl RepositoryHarvest {
    fn new(repository: RepositoryId) -> Self {
        Self {
            repository,
            records: Vec::new(),
            pages: 0,
            nodes_seen: 0,
            reached_limit: false,
            cancelled: false,
        }
    }
}

/// Outcome of a sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Repositories counted toward the target (harvested + already processed)
    pub repositories_counted: usize,
    pub harvested: usize,
    pub already_processed: usize,
    /// Skipped for having too few pull requests; not counted
    pub below_threshold: usize,
    /// Aborted by a fatal error; not counted
    pub failed: usize,
    pub records_written: usize,
    pub search_pages: usize,
    pub cancelled: bool,
}

/// Drives page walking, extraction and batch hand-off
pub struct HarvestCoordinator<'a> {
    client: &'a GraphQlClient,
    settings: HarvestSettings,
    cancel: CancellationToken,
}

impl<'a> HarvestCoordinator<'a> {
    pub fn new(client: &'a GraphQlClient, settings: HarvestSettings) -> Self {
        Self {
            client,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between pages and repositories once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Total pull requests in a repository, open ones included
    pub async fn pull_request_total(&self, repo: &RepositoryId) -> Result<u64> {
        let data = self
            .client
            .execute(
                queries::PULL_REQUEST_TOTAL,
                &json!({ "owner": repo.owner, "name": repo.name }),
            )
            .await?;

        data.pointer("/repository/pullRequests/totalCount")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                Error::DataShape(format!("no pull request total for repository {}", repo))
            })
    }

    /// Harvest one repository, stopping after `limit` records if given
    ///
    /// A limit cutoff is a normal early return. Fatal query errors and shape
    /// errors propagate; no partial page is salvaged.
    pub async fn harvest(&self, repo: &RepositoryId, limit: Option<usize>) -> Result<RepositoryHarvest> {
        let mut harvest = RepositoryHarvest::new(repo.clone());
        if limit == Some(0) {
            harvest.reached_limit = true;
            return Ok(harvest);
        }

        let variables = json!({
            "owner": repo.owner,
            "name": repo.name,
            "first": self.settings.pr_page_size,
        });
        let mut walker: PageWalker<'_, PullRequestNode> = PageWalker::new(
            self.client,
            queries::PULL_REQUESTS,
            variables,
            queries::PULL_REQUESTS_PATH,
        );

        while let Some(page) = walker.next_page().await? {
            harvest.pages = walker.pages_fetched();
            for node in page {
                harvest.nodes_seen += 1;
                let Some(record) = extract(node) else {
                    continue;
                };
                harvest.records.push(record);

                if limit.is_some_and(|max| harvest.records.len() >= max) {
                    harvest.reached_limit = true;
                    info!(
                        repository = %repo,
                        records = harvest.records.len(),
                        "Record limit reached"
                    );
                    return Ok(harvest);
                }
            }

            debug!(
                repository = %repo,
                page = harvest.pages,
                seen = harvest.nodes_seen,
                kept = harvest.records.len(),
                "Processed pull request page"
            );

            if self.cancel.is_cancelled() && !walker.is_exhausted() {
                warn!(repository = %repo, pages = harvest.pages, "Harvest cancelled between pages");
                harvest.cancelled = true;
                return Ok(harvest);
            }
        }

        info!(
            repository = %repo,
            pages = harvest.pages,
            seen = harvest.nodes_seen,
            records = harvest.records.len(),
            "Harvested repository"
        );
        Ok(harvest)
    }

    /// Sweep popular repositories until `target` are counted
    ///
    /// Repositories already in the sink's inventory count toward the target
    /// but are not harvested again. Each harvested repository is written to
    /// the sink as soon as it completes, so a later failure never loses it.
    pub async fn sweep_popular<S: RecordSink>(&self, sink: &mut S, target: usize) -> Result<SweepSummary> {
        let processed = sink.inventory()?;
        let mut summary = SweepSummary::default();
        info!(
            target,
            already_processed = processed.len(),
            query = %self.settings.search_query,
            "Starting repository sweep"
        );
        if target == 0 {
            return Ok(summary);
        }

        let variables = json!({
            "query": self.settings.search_query,
            "first": self.settings.repo_page_size,
        });
        let mut walker: PageWalker<'_, RepositoryNode> = PageWalker::new(
            self.client,
            queries::REPOSITORY_SEARCH,
            variables,
            queries::REPOSITORY_SEARCH_PATH,
        );
        // Search results can shift between pages
        let mut seen: HashSet<RepositoryId> = HashSet::new();

        while let Some(page) = walker.next_page().await? {
            summary.search_pages = walker.pages_fetched();

            for node in page {
                let Some(repo) = node.id() else {
                    warn!(name = %node.name, "Skipping search result without an owner");
                    continue;
                };
                if !seen.insert(repo.clone()) {
                    continue;
                }

                let pull_requests = node.pull_request_count();
                if pull_requests < self.settings.min_pull_requests {
                    summary.below_threshold += 1;
                    debug!(repository = %repo, pull_requests, "Too few pull requests, skipping");
                    continue;
                }

                if processed.contains(&repo) {
                    summary.already_processed += 1;
                    summary.repositories_counted += 1;
                    info!(
                        repository = %repo,
                        progress = %format!("{}/{}", summary.repositories_counted, target),
                        "Already harvested, skipping"
                    );
                } else {
                    match self.harvest(&repo, None).await {
                        Ok(harvest) if harvest.cancelled => {
                            summary.cancelled = true;
                            warn!(repository = %repo, "Sweep cancelled, partial repository discarded");
                            return Ok(summary);
                        }
                        Ok(harvest) => {
                            sink.write_batch(&repo, &harvest.records)?;
                            summary.harvested += 1;
                            summary.repositories_counted += 1;
                            summary.records_written += harvest.records.len();
                            info!(
                                repository = %repo,
                                records = harvest.records.len(),
                                progress = %format!("{}/{}", summary.repositories_counted, target),
                                "Repository complete"
                            );
                        }
                        Err(err) => {
                            summary.failed += 1;
                            error!(repository = %repo, error = %err, "Repository harvest failed, continuing sweep");
                        }
                    }
                }

                if summary.repositories_counted >= target {
                    info!(?summary, "Sweep target reached");
                    return Ok(summary);
                }
                if self.cancel.is_cancelled() {
                    summary.cancelled = true;
                    warn!(?summary, "Sweep cancelled");
                    return Ok(summary);
                }
            }

            if self.cancel.is_cancelled() && !walker.is_exhausted() {
                summary.cancelled = true;
                warn!(?summary, "Sweep cancelled between search pages");
                return Ok(summary);
            }
        }

        info!(?summary, "Repository search exhausted");
        Ok(summary)
    }
}
