pub mod config;
pub mod crawlers;
pub mod error;
pub mod parsers;
pub mod results;
pub mod site;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::CrawlerConfig;
pub use error::{CrawlError, FailureKind, FetchFailure, IndexFailure};
pub use results::{CrawlResult, FinalDocument, Record, SectionMap, Tier};
pub use site::{SiteLayout, WorkItem};

use crawlers::{Fetcher, HttpFetcher, Orchestrator, RoundOptions, TwoTierAcquirer, build_index};
use results::FAILED_KEY;
use std::sync::Arc;
use std::time::Instant;
use utils::Sleeper;

/// Builder for one crawl of the catalog site
pub struct Catalog {
    config: CrawlerConfig,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_config(CrawlerConfig::default())
    }
}

impl Catalog {
    /// Create a builder for the given origin with default settings
    pub fn new(base_url: &str) -> Self {
        Self::from_config(CrawlerConfig::new(base_url))
    }

    pub fn from_config(config: CrawlerConfig) -> Self {
        Self {
            config,
            sleeper: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: CrawlerConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(
        self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config = CrawlerConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a JSON string
    pub fn with_config_str(self, json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config = CrawlerConfig::from_json(json)?;
        Ok(self.with_config(config))
    }

    /// Apply the base URL environment override, if set
    pub fn with_env(mut self) -> Self {
        self.config = self.config.apply_env();
        self
    }

    /// Set the catalog origin
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    /// Set the maximum number of items acquired concurrently
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    /// Set the number of retry rounds after the first pass
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.config.max_rounds = max_rounds;
        self
    }

    /// Set the attempts per fetch, including the first
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    /// Set the pause before each retry round, in seconds
    pub fn with_round_delay(mut self, seconds: u64) -> Self {
        self.config.round_delay_secs = seconds;
        self
    }

    /// Use a custom sleeper for backoff, round and item delays
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Run the whole crawl: index, acquisition rounds, assembly.
    ///
    /// Fails only when the crawl cannot start (bad base URL, client setup,
    /// unreachable index page). Item failures end up under the reserved
    /// failure key instead.
    pub async fn crawl(self) -> Result<FinalDocument, CrawlError> {
        let start_time = Instant::now();
        let config = self.config;

        let site = SiteLayout::parse(&config.base_url, &config.home_path, &config.watch_prefix)
            .map_err(|source| IndexFailure::InvalidBase {
                url: config.base_url.clone(),
                source,
            })?;

        let mut http = HttpFetcher::from_config(&config, &site.origin())?;
        if let Some(sleeper) = &self.sleeper {
            http = http.with_sleeper(Arc::clone(sleeper));
        }
        let fetcher: Arc<dyn Fetcher> = Arc::new(http);

        let index = build_index(fetcher.as_ref(), &site).await?;
        if index.work.is_empty() {
            ::log::warn!("Index page listed no entries");
        }

        let acquirer = Arc::new(TwoTierAcquirer::new(fetcher, site));
        let mut orchestrator = Orchestrator::new(acquirer, RoundOptions::from_config(&config));
        if let Some(sleeper) = self.sleeper {
            orchestrator = orchestrator.with_sleeper(sleeper);
        }

        let result = orchestrator.run(index.work.clone()).await;

        ::log::info!(
            "Crawl complete in {:.2} seconds: {} rounds, {} rich, {} degraded, {} failed",
            start_time.elapsed().as_secs_f64(),
            result.rounds_run(),
            result.count_tier(Tier::Rich),
            result.count_tier(Tier::Degraded),
            result.failed().len()
        );
        if !result.failed().is_empty() {
            ::log::info!(
                "Listing {} never-acquired entries under '{}'",
                result.failed().len(),
                FAILED_KEY
            );
        }

        Ok(FinalDocument::assemble(&index.sections, &result))
    }
}
