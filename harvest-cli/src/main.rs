//! pr-harvest - Command line interface for the pull request harvester
//!
//! Collects review metadata for merged and closed pull requests from the
//! GitHub GraphQL API and writes one CSV batch per repository.

mod commands;

use clap::{Parser, Subcommand};
use harvest_core::{Config, Secrets};
use harvest_github::GraphQlClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{RepoArgs, SweepArgs};

/// Harvest pull request review metadata from GitHub
#[derive(Parser, Debug)]
#[command(name = "pr-harvest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for CSV batches (overrides config and env)
    #[arg(long, global = true, env = "PR_HARVEST_OUTPUT_DIR")]
    output_dir: Option<std::path::PathBuf>,

    /// GraphQL endpoint (overrides config and env)
    #[arg(long, global = true, env = "PR_HARVEST_ENDPOINT")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Harvest a single repository
    Repo(RepoArgs),

    /// Sweep popular repositories until a target count is reached
    Sweep(SweepArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = Config::load_with_overrides(cli.output_dir.clone(), cli.endpoint.clone())?;

    if cli.verbose {
        tracing::debug!(
            endpoint = %config.api.endpoint,
            output_dir = %config.harvest.output_dir.display(),
            max_attempts = config.retry.max_attempts,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("pr-harvest {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Repo(args)) => {
            let client = build_client(&config)?;
            let cancel = cancel_on_ctrl_c();
            args.execute(&config, &client, cancel).await?;
        }
        Some(Commands::Sweep(args)) => {
            let client = build_client(&config)?;
            let cancel = cancel_on_ctrl_c();
            args.execute(&config, &client, cancel).await?;
        }
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("pr-harvest - pull request review metadata harvester");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn build_client(config: &Config) -> anyhow::Result<GraphQlClient> {
    let token = Secrets::load()?.github_token();
    Ok(GraphQlClient::from_config(config, token)?)
}

/// Token cancelled on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping at the next page boundary");
            child.cancel();
        }
    });
    token
}

fn print_config(config: &Config) {
    println!("pr-harvest Configuration");
    println!("========================");
    println!();
    println!("API:");
    println!("  endpoint: {}", config.api.endpoint);
    println!("  request_timeout: {:?}", config.api.request_timeout);
    println!("  user_agent: {}", config.api.user_agent);
    println!();
    println!("Retry:");
    println!("  max_attempts: {}", config.retry.max_attempts);
    println!("  base_delay: {:?}", config.retry.base_delay);
    println!("  backoff_multiplier: {}", config.retry.backoff_multiplier);
    println!("  jitter: {:?}", config.retry.jitter);
    println!("  retryable_statuses: {:?}", config.retry.retryable_statuses);
    println!("  partial_errors: {:?}", config.retry.partial_errors);
    println!();
    println!("Harvest:");
    println!("  output_dir: {}", config.harvest.output_dir.display());
    println!("  pr_page_size: {}", config.harvest.pr_page_size);
    println!("  repo_page_size: {}", config.harvest.repo_page_size);
    println!("  min_pull_requests: {}", config.harvest.min_pull_requests);
    println!("  sweep_target: {}", config.harvest.sweep_target);
    println!("  search_query: {}", config.harvest.search_query);
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
    if let Some(path) = Secrets::default_secrets_path() {
        println!("Secrets file: {}", path.display());
    }
}
