//! Sweep command - Harvest popular repositories until a target is reached

use clap::Args;
use harvest_core::{Config, CsvDirectorySink};
use harvest_github::{GraphQlClient, HarvestCoordinator};
use tokio_util::sync::CancellationToken;

/// Arguments for the sweep command
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Repositories to count, including ones already harvested
    #[arg(short = 'n', long)]
    pub target: Option<usize>,

    /// Minimum pull request count for a repository to qualify
    #[arg(long)]
    pub min_prs: Option<u64>,

    /// Search query (overrides config)
    #[arg(long)]
    pub query: Option<String>,
}

impl SweepArgs {
    /// Execute the sweep command
    pub async fn execute(
        &self,
        config: &Config,
        client: &GraphQlClient,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let mut settings = config.harvest.clone();
        if let Some(min) = self.min_prs {
            settings.min_pull_requests = min;
        }
        if let Some(query) = &self.query {
            settings.search_query = query.clone();
        }
        let target = self.target.unwrap_or(settings.sweep_target);

        let mut sink = CsvDirectorySink::new(&settings.output_dir)?;
        let coordinator = HarvestCoordinator::new(client, settings).with_cancellation(cancel);
        let summary = coordinator.sweep_popular(&mut sink, target).await?;

        println!("Sweep Summary");
        println!("=============");
        println!("Counted: {}/{}", summary.repositories_counted, target);
        println!("Harvested: {}", summary.harvested);
        println!("Already processed: {}", summary.already_processed);
        println!("Below threshold: {}", summary.below_threshold);
        println!("Failed: {}", summary.failed);
        println!("Records written: {}", summary.records_written);
        println!("Output: {}", sink.dir().display());
        if summary.cancelled {
            println!("(interrupted - rerun to continue)");
        }

        Ok(())
    }
}
