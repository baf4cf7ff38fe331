//! Configuration management for the harvester
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (PR_HARVEST_*)
//! 3. Config file (~/.config/pr-harvest/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::{Error, Result};

/// What to do with a GraphQL response that carries both `data` and `errors`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialErrorPolicy {
    /// Treat the response as a transient failure and retry it
    #[default]
    Retry,
    /// Keep the data and log the errors
    Accept,
}

/// GraphQL endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// GraphQL endpoint URL
    pub endpoint: String,

    /// Timeout for a single HTTP request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.github.com/graphql".to_string(),
            request_timeout: Duration::from_secs(45),
            user_agent: concat!("pr-harvest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiConfig {
    /// Parse the configured endpoint
    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint)
            .map_err(|e| Error::Config(format!("Invalid endpoint '{}': {}", self.endpoint, e)))
    }
}

/// Retry and backoff settings for GraphQL requests
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total number of attempts per request, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,

    /// Growth factor applied to the delay after each retry
    pub backoff_multiplier: f64,

    /// Upper bound of the random jitter added to each delay
    #[serde(with = "humantime_serde")]
    pub jitter: Duration,

    /// Cap for the delay before jitter
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    /// HTTP status codes that are worth retrying
    pub retryable_statuses: Vec<u16>,

    /// Handling of responses with partial errors
    pub partial_errors: PartialErrorPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            retryable_statuses: vec![429, 500, 502, 503, 504],
            partial_errors: PartialErrorPolicy::Retry,
        }
    }
}

/// Harvesting behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarvestSettings {
    /// Directory receiving one CSV file per repository
    pub output_dir: PathBuf,

    /// Pull requests requested per page
    pub pr_page_size: u32,

    /// Repositories requested per search page
    pub repo_page_size: u32,

    /// Repositories with fewer pull requests are skipped during a sweep
    pub min_pull_requests: u64,

    /// Number of repositories a sweep aims for
    pub sweep_target: usize,

    /// Search expression used to discover popular repositories
    pub search_query: String,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("datasets"),
            pr_page_size: 50,
            repo_page_size: 10,
            min_pull_requests: 100,
            sweep_target: 200,
            search_query: "stars:>1 sort:stars-desc".to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// GraphQL endpoint configuration
    pub api: ApiConfig,

    /// Retry configuration
    pub retry: RetrySettings,

    /// Harvest configuration
    pub harvest: HarvestSettings,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/pr-harvest/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pr-harvest").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - PR_HARVEST_ENDPOINT: GraphQL endpoint
    /// - PR_HARVEST_OUTPUT_DIR: Output directory for CSV batches
    /// - PR_HARVEST_MAX_ATTEMPTS: Retry budget per request
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("PR_HARVEST_ENDPOINT") {
            self.api.endpoint = endpoint;
        }

        if let Ok(dir) = std::env::var("PR_HARVEST_OUTPUT_DIR") {
            self.harvest.output_dir = PathBuf::from(dir);
        }

        if let Ok(raw) = std::env::var("PR_HARVEST_MAX_ATTEMPTS") {
            match raw.trim().parse() {
                Ok(attempts) => self.retry.max_attempts = attempts,
                Err(_) => warn!(value = %raw, "Ignoring unparseable PR_HARVEST_MAX_ATTEMPTS"),
            }
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, output_dir: Option<PathBuf>, endpoint: Option<String>) -> Self {
        if let Some(dir) = output_dir {
            self.harvest.output_dir = dir;
        }

        if let Some(endpoint) = endpoint {
            self.api.endpoint = endpoint;
        }

        self
    }

    /// Load configuration with all overrides applied, then validate it
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(output_dir: Option<PathBuf>, endpoint: Option<String>) -> Result<Self> {
        let config = Self::load()?
            .with_env_overrides()
            .with_cli_overrides(output_dir, endpoint);
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the harvester cannot work with
    pub fn validate(&self) -> Result<()> {
        self.api.endpoint_url()?;

        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config(
                "retry.backoff_multiplier must be a finite number >= 1.0".to_string(),
            ));
        }
        // GitHub caps connection pages at 100 nodes
        for (name, size) in [
            ("harvest.pr_page_size", self.harvest.pr_page_size),
            ("harvest.repo_page_size", self.harvest.repo_page_size),
        ] {
            if !(1..=100).contains(&size) {
                return Err(Error::Config(format!("{} must be between 1 and 100, got {}", name, size)));
            }
        }

        Ok(())
    }
}
