//! Repo command - Harvest one repository into a CSV batch

use std::time::Instant;

use clap::Args;
use harvest_core::{Config, CsvDirectorySink, RecordSink, RepositoryId};
use harvest_github::{GraphQlClient, HarvestCoordinator};
use tokio_util::sync::CancellationToken;

/// Arguments for the repo command
#[derive(Args, Debug)]
pub struct RepoArgs {
    /// Repository as `owner/name`
    #[arg(required = true)]
    pub repository: RepositoryId,

    /// Stop after this many qualifying pull requests
    #[arg(long)]
    pub max_prs: Option<usize>,

    /// Print the records instead of writing a batch
    #[arg(long)]
    pub dry_run: bool,
}

impl RepoArgs {
    /// Execute the repo command
    pub async fn execute(
        &self,
        config: &Config,
        client: &GraphQlClient,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let started = Instant::now();
        let coordinator =
            HarvestCoordinator::new(client, config.harvest.clone()).with_cancellation(cancel);

        let total = coordinator.pull_request_total(&self.repository).await?;
        tracing::info!(repository = %self.repository, total, "Harvesting repository");

        let harvest = coordinator.harvest(&self.repository, self.max_prs).await?;

        println!("Repository: {}", self.repository);
        println!("Pull requests: {}", total);
        println!("Inspected: {}", harvest.nodes_seen);
        println!("Qualifying: {}", harvest.records.len());
        println!("Elapsed: {:.1} min", started.elapsed().as_secs_f64() / 60.0);
        if harvest.reached_limit {
            println!("(stopped at --max-prs {})", self.max_prs.unwrap_or_default());
        }
        if harvest.cancelled {
            println!("(interrupted - nothing written)");
            return Ok(());
        }

        if self.dry_run {
            for record in &harvest.records {
                println!(
                    "  #{} {:>8.2}h {:<18} {}",
                    record.number, record.hours_open, record.final_review_state, record.title
                );
            }
            return Ok(());
        }

        let mut sink = CsvDirectorySink::new(&config.harvest.output_dir)?;
        sink.write_batch(&self.repository, &harvest.records)?;
        println!("Written: {}", sink.path_for(&self.repository).display());

        Ok(())
    }
}
