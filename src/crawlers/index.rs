use crate::crawlers::fetcher::Fetcher;
use crate::error::IndexFailure;
use crate::parsers::home;
use crate::results::SectionMap;
use crate::site::{SiteLayout, WorkItem};

/// Crawl plan read from the index page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlIndex {
    pub sections: SectionMap,
    /// Every item across all sections, deduplicated, in first-appearance order
    pub work: Vec<WorkItem>,
}

/// Fetches the index page and reads its sections.
///
/// Any fetch failure here is fatal to the crawl: there is no partial index.
pub async fn build_index(
    fetcher: &dyn Fetcher,
    site: &SiteLayout,
) -> Result<CrawlIndex, IndexFailure> {
    let home_url = site.home_url().map_err(|source| IndexFailure::InvalidBase {
        url: site.base().to_string(),
        source,
    })?;

    ::log::info!("Fetching index page: {}", home_url);
    let html = fetcher.fetch(home_url.as_str()).await?;

    let sections = home::parse_sections(&html);
    let work = sections.work_set();

    ::log::info!(
        "Found {} sections and {} unique entries to process",
        sections.len(),
        work.len()
    );

    Ok(CrawlIndex { sections, work })
}
