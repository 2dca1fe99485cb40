//! Extraction of the degraded (detail) page: title, description and poster only.

use super::text::DETAIL_MORE_MARKER;
use super::{description_text, first_text, selector, watch};
use crate::results::Record;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".anisc-detail .film-name a"));
static TITLE_PLAIN: LazyLock<Selector> = LazyLock::new(|| selector(".anisc-detail .film-name"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(".anisc-detail .film-description"));

/// Extracts a degraded record, or `None` when the page has no title.
///
/// Only the title is required. Description and poster are best-effort here,
/// unlike the detail page's own layout where all three are always present:
/// a detail page missing either still yields a record with that field empty.
/// Streaming pointer, servers and episodes are always left empty.
pub fn extract(html: &str, source_url: &str) -> Option<Record> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let title = first_text(root, &TITLE).or_else(|| first_text(root, &TITLE_PLAIN));
    let Some(title) = title else {
        ::log::debug!("Detail page {} has no title", source_url);
        return None;
    };

    let description = description_text(root, &DESCRIPTION, DETAIL_MORE_MARKER);

    Some(Record::degraded(
        title,
        source_url.to_string(),
        watch::poster_url(root),
        description,
    ))
}
