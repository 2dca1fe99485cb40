use thiserror::Error;

/// Coarse classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The page does not exist (404 or a soft-404 page)
    NotFound,
    /// Non-retryable failure (other non-2xx status, malformed request, ...)
    Permanent,
    /// Transient failures persisted past the retry bound
    Exhausted,
}

/// Outcome of a fetch that did not produce a document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("permanent failure fetching {url}: {reason}")]
    Permanent {
        url: String,
        /// HTTP status, when the failure came from a response
        status: Option<u16>,
        reason: String,
    },

    #[error("gave up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl FetchFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchFailure::NotFound { .. } => FailureKind::NotFound,
            FetchFailure::Permanent { .. } => FailureKind::Permanent,
            FetchFailure::Exhausted { .. } => FailureKind::Exhausted,
        }
    }
}

/// The index page could not be turned into a crawl plan
#[derive(Debug, Error)]
pub enum IndexFailure {
    #[error("invalid base URL {url}: {source}")]
    InvalidBase {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to fetch index page: {0}")]
    Fetch(#[from] FetchFailure),
}

/// Errors that stop a crawl before any document is produced
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Index(#[from] IndexFailure),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
