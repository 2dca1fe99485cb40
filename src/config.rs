use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Environment variable overriding the catalog origin
pub const BASE_URL_ENV: &str = "CATALOG_BASE_URL";

/// Configuration for one catalog crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Origin of the catalog site
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the index page
    #[serde(default = "default_home_path")]
    pub home_path: String,

    /// Path prefix of the rich page variant
    #[serde(default = "default_watch_prefix")]
    pub watch_prefix: String,

    /// Browser identity sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Attempts per fetch, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base of the exponential backoff, in milliseconds
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of items acquired concurrently
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Retry rounds after the first pass
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Pause before each retry round, in seconds
    #[serde(default = "default_round_delay_secs")]
    pub round_delay_secs: u64,

    /// Politeness pause after each item completes, in milliseconds
    #[serde(default)]
    pub item_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            home_path: default_home_path(),
            watch_prefix: default_watch_prefix(),
            user_agent: default_user_agent(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            max_rounds: default_max_rounds(),
            round_delay_secs: default_round_delay_secs(),
            item_delay_ms: 0,
        }
    }
}

impl CrawlerConfig {
    /// Create a configuration for the given origin with default values
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Apply the base URL environment override, if set and non-empty
    pub fn apply_env(self) -> Self {
        self.override_base_url(std::env::var(BASE_URL_ENV).ok())
    }

    fn override_base_url(mut self, value: Option<String>) -> Self {
        if let Some(base_url) = value.filter(|v| !v.trim().is_empty()) {
            ::log::info!("Using base URL from {}: {}", BASE_URL_ENV, base_url);
            self.base_url = base_url;
        }
        self
    }
}

fn default_base_url() -> String {
    "https://aniwatchtv.to".to_string()
}

fn default_home_path() -> String {
    "/home".to_string()
}

fn default_watch_prefix() -> String {
    "/watch".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    45
}

fn default_max_concurrency() -> usize {
    3
}

fn default_max_rounds() -> usize {
    2
}

fn default_round_delay_secs() -> u64 {
    5
}
