//! Two-tier acquisition of one catalog entry.
//!
//! The rich (watch) page is tried first. Any miss on that tier, whether a
//! fetch failure of any kind or a page without a title, falls through to the
//! degraded (detail) page. Each tier fetches at most once per call; repeating
//! the whole acquisition is the orchestrator's job.

use crate::crawlers::fetcher::Fetcher;
use crate::error::FetchFailure;
use crate::parsers::{self, detail, watch};
use crate::results::{Record, Tier};
use crate::site::{SiteLayout, WorkItem};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Why one tier produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierMiss {
    Fetch(FetchFailure),
    /// Success status, but the page is an error page
    SoftNotFound,
    /// Page fetched, but it lacks a title
    NoRecord,
    /// The locator could not be turned into a URL
    InvalidLocator(String),
}

impl fmt::Display for TierMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierMiss::Fetch(failure) => write!(f, "{}", failure),
            TierMiss::SoftNotFound => f.write_str("error page served as success"),
            TierMiss::NoRecord => f.write_str("page has no title"),
            TierMiss::InvalidLocator(reason) => write!(f, "invalid locator: {}", reason),
        }
    }
}

/// Why an item produced no record in this round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireFailure {
    /// Both tiers missed
    Tiers { rich: TierMiss, degraded: TierMiss },
    /// The acquisition task faulted and was contained at the item boundary
    Fault(String),
}

impl fmt::Display for AcquireFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireFailure::Tiers { rich, degraded } => {
                write!(f, "rich: {}; degraded: {}", rich, degraded)
            }
            AcquireFailure::Fault(reason) => write!(f, "fault: {}", reason),
        }
    }
}

/// Tagged outcome of one acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Rich(Record),
    Degraded(Record),
    Failed(AcquireFailure),
}

impl Acquisition {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Acquisition::Rich(_) => Some(Tier::Rich),
            Acquisition::Degraded(_) => Some(Tier::Degraded),
            Acquisition::Failed(_) => None,
        }
    }

    /// Split into the record and its tier, or the failure
    pub fn into_result(self) -> Result<(Record, Tier), AcquireFailure> {
        match self {
            Acquisition::Rich(record) => Ok((record, Tier::Rich)),
            Acquisition::Degraded(record) => Ok((record, Tier::Degraded)),
            Acquisition::Failed(failure) => Err(failure),
        }
    }
}

/// Per-item acquisition, as seen by the orchestrator
#[async_trait]
pub trait Acquire: Send + Sync {
    async fn acquire(&self, item: &WorkItem) -> Acquisition;
}

/// Rich-then-degraded acquisition over a shared fetcher
#[derive(Clone)]
pub struct TwoTierAcquirer {
    fetcher: Arc<dyn Fetcher>,
    site: SiteLayout,
}

impl TwoTierAcquirer {
    pub fn new(fetcher: Arc<dyn Fetcher>, site: SiteLayout) -> Self {
        Self { fetcher, site }
    }

    async fn rich_attempt(&self, item: &WorkItem, source_url: &str) -> Result<Record, TierMiss> {
        let url = self
            .site
            .rich_url(item)
            .map_err(|e| TierMiss::InvalidLocator(e.to_string()))?;

        let html = self
            .fetcher
            .fetch(url.as_str())
            .await
            .map_err(TierMiss::Fetch)?;

        if parsers::looks_like_not_found(&html) {
            return Err(TierMiss::SoftNotFound);
        }

        watch::extract(&html, source_url, &self.site)
            .filter(Record::is_valid)
            .ok_or(TierMiss::NoRecord)
    }

    async fn degraded_attempt(&self, source_url: &str) -> Result<Record, TierMiss> {
        let html = self
            .fetcher
            .fetch(source_url)
            .await
            .map_err(TierMiss::Fetch)?;

        detail::extract(&html, source_url)
            .filter(Record::is_valid)
            .ok_or(TierMiss::NoRecord)
    }
}

#[async_trait]
impl Acquire for TwoTierAcquirer {
    async fn acquire(&self, item: &WorkItem) -> Acquisition {
        let source_url = match self.site.degraded_url(item) {
            Ok(url) => url.to_string(),
            Err(e) => {
                let miss = TierMiss::InvalidLocator(e.to_string());
                return Acquisition::Failed(AcquireFailure::Tiers {
                    rich: miss.clone(),
                    degraded: miss,
                });
            }
        };

        let rich_miss = match self.rich_attempt(item, &source_url).await {
            Ok(record) => return Acquisition::Rich(record),
            Err(miss) => miss,
        };
        ::log::debug!("Rich tier missed for {} ({}), trying detail page", item, rich_miss);

        match self.degraded_attempt(&source_url).await {
            Ok(record) => Acquisition::Degraded(record),
            Err(degraded_miss) => Acquisition::Failed(AcquireFailure::Tiers {
                rich: rich_miss,
                degraded: degraded_miss,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::parsers::tests::fixtures;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned responses per URL and counts calls
    #[derive(Default)]
    struct ScriptedFetcher {
        responses: HashMap<String, Result<String, FailureKind>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn page(mut self, url: &str, body: String) -> Self {
            self.responses.insert(url.to_string(), Ok(body));
            self
        }

        fn failure(mut self, url: &str, kind: FailureKind) -> Self {
            self.responses.insert(url.to_string(), Err(kind));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchFailure> {
            self.calls.lock().unwrap().push(url.to_string());
            let url_owned = url.to_string();
            match self.responses.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(FailureKind::NotFound)) | None => {
                    Err(FetchFailure::NotFound { url: url_owned })
                }
                Some(Err(FailureKind::Permanent)) => Err(FetchFailure::Permanent {
                    url: url_owned,
                    status: Some(403),
                    reason: "HTTP 403".into(),
                }),
                Some(Err(FailureKind::Exhausted)) => Err(FetchFailure::Exhausted {
                    url: url_owned,
                    attempts: 3,
                    last_error: "HTTP 503".into(),
                }),
            }
        }
    }

    const RICH: &str = "https://catalog.example/watch/show-1";
    const DETAIL: &str = "https://catalog.example/show-1";

    fn acquirer(fetcher: Arc<ScriptedFetcher>) -> TwoTierAcquirer {
        let site = SiteLayout::parse("https://catalog.example", "/home", "/watch").unwrap();
        TwoTierAcquirer::new(fetcher, site)
    }

    #[tokio::test]
    async fn test_rich_success_skips_detail_page() {
        let fetcher = Arc::new(ScriptedFetcher::default().page(RICH, fixtures::watch_page("Show")));
        let outcome = acquirer(fetcher.clone()).acquire(&"/show-1".into()).await;

        let record = match outcome {
            Acquisition::Rich(record) => record,
            other => panic!("expected rich record, got {other:?}"),
        };
        assert_eq!(record.title, "Show");
        assert_eq!(record.source_url, DETAIL);
        assert_eq!(fetcher.calls(), vec![RICH]);
    }

    #[tokio::test]
    async fn test_not_found_falls_back_exactly_once() {
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .failure(RICH, FailureKind::NotFound)
                .page(DETAIL, fixtures::detail_page("Show")),
        );
        let outcome = acquirer(fetcher.clone()).acquire(&"/show-1".into()).await;

        let record = match outcome {
            Acquisition::Degraded(record) => record,
            other => panic!("expected degraded record, got {other:?}"),
        };
        assert!(record.streaming_pointer.is_none());
        assert!(record.episodes.is_empty());
        assert!(record.server_groups.is_empty());
        assert_eq!(fetcher.calls(), vec![RICH, DETAIL]);
    }

    #[tokio::test]
    async fn test_untitled_rich_page_still_falls_back() {
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .page(RICH, fixtures::untitled_page())
                .page(DETAIL, fixtures::detail_page("Show")),
        );
        let outcome = acquirer(fetcher.clone()).acquire(&"/show-1".into()).await;

        assert_eq!(outcome.tier(), Some(Tier::Degraded));
        assert_eq!(fetcher.calls(), vec![RICH, DETAIL]);
    }

    #[tokio::test]
    async fn test_soft_not_found_rich_page_falls_back() {
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .page(RICH, fixtures::soft_not_found_page())
                .page(DETAIL, fixtures::detail_page("Show")),
        );
        let outcome = acquirer(fetcher.clone()).acquire(&"/show-1".into()).await;

        assert_eq!(outcome.tier(), Some(Tier::Degraded));
    }

    #[tokio::test]
    async fn test_permanent_and_exhausted_rich_failures_fall_back() {
        for kind in [FailureKind::Permanent, FailureKind::Exhausted] {
            let fetcher = Arc::new(
                ScriptedFetcher::default()
                    .failure(RICH, kind)
                    .page(DETAIL, fixtures::detail_page("Show")),
            );
            let outcome = acquirer(fetcher.clone()).acquire(&"/show-1".into()).await;

            assert_eq!(outcome.tier(), Some(Tier::Degraded), "rich failure {kind:?}");
            assert_eq!(fetcher.calls().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_both_tiers_missing_is_failure() {
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .failure(RICH, FailureKind::Exhausted)
                .page(DETAIL, fixtures::untitled_page()),
        );
        let outcome = acquirer(fetcher.clone()).acquire(&"/show-1".into()).await;

        match outcome {
            Acquisition::Failed(AcquireFailure::Tiers { rich, degraded }) => {
                assert!(matches!(rich, TierMiss::Fetch(ref f) if f.kind() == FailureKind::Exhausted));
                assert_eq!(degraded, TierMiss::NoRecord);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(fetcher.calls(), vec![RICH, DETAIL]);
    }

    #[tokio::test]
    async fn test_query_kept_for_detail_stripped_for_watch() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let _ = acquirer(fetcher.clone())
            .acquire(&"/show-1?ref=home".into())
            .await;

        assert_eq!(
            fetcher.calls(),
            vec![RICH, "https://catalog.example/show-1?ref=home"]
        );
    }
}
