pub mod acquire;
pub mod fetcher;
pub mod index;
pub mod orchestrator;
pub mod web;


pub use acquire::{Acquire, AcquireFailure, Acquisition, TierMiss, TwoTierAcquirer};
pub use fetcher::Fetcher;
pub use index::{CrawlIndex, build_index};
pub use orchestrator::{Orchestrator, RoundOptions};
pub use web::{HttpFetcher, RetryPolicy};
