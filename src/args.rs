use clap::Parser;
use std::path::PathBuf;
use yield_catalog::Catalog;

#[derive(Parser, Debug)]
#[command(name = "yield-catalog")]
#[command(about = "Crawls a catalog site's index and detail pages into one JSON document")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short = 'f', long)]
    pub config: Option<PathBuf>,

    /// Output file; "-" writes to stdout
    #[arg(short, long, default_value = "anime_data.json")]
    pub output: String,

    /// Catalog origin (overrides config and environment)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Number of items acquired concurrently
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Retry rounds after the first pass
    #[arg(long)]
    pub max_rounds: Option<usize>,

    /// Attempts per page fetch
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Pause before each retry round, in seconds
    #[arg(long)]
    pub round_delay: Option<u64>,

    /// Write compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

impl Args {
    /// Layer command-line overrides onto the builder
    pub fn configure(&self, mut catalog: Catalog) -> Catalog {
        if let Some(base_url) = &self.base_url {
            catalog = catalog.with_base_url(base_url);
        }
        if let Some(concurrency) = self.concurrency {
            catalog = catalog.with_max_concurrency(concurrency);
        }
        if let Some(max_rounds) = self.max_rounds {
            catalog = catalog.with_max_rounds(max_rounds);
        }
        if let Some(max_attempts) = self.max_attempts {
            catalog = catalog.with_max_attempts(max_attempts);
        }
        if let Some(round_delay) = self.round_delay {
            catalog = catalog.with_round_delay(round_delay);
        }
        catalog
    }
}
