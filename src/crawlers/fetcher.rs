use crate::error::FetchFailure;
use async_trait::async_trait;

/// Source of page bodies.
///
/// Implementations must be safe to call from many workers at once and keep
/// no per-request mutable state.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return its body, retrying transient failures internally
    async fn fetch(&self, url: &str) -> Result<String, FetchFailure>;
}
