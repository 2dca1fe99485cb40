//! Index page parsing: labeled sections and the items they list.

use super::{element_text, selector, text};
use crate::results::{FAILED_KEY, SectionMap};
use crate::site::WorkItem;
use crate::utils::sanitize_key;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Fixed label for the slider block, which carries no heading
pub const SPOTLIGHT_LABEL: &str = "Spotlight";

static SECTION: LazyLock<Selector> =
    LazyLock::new(|| selector("section.block_area, #anime-featured, .deslide-wrap"));
static HEADER: LazyLock<Selector> =
    LazyLock::new(|| selector(".bah-heading h2.cat-heading, .anif-block-header"));
static SLIDER: LazyLock<Selector> = LazyLock::new(|| selector("#slider"));
static ITEM: LazyLock<Selector> =
    LazyLock::new(|| selector(".flw-item, .deslide-item, .item-qtip, .anif-block li"));
static ITEM_LINK: LazyLock<Selector> = LazyLock::new(|| {
    selector("a.film-poster-ahref, .desi-buttons a.btn-secondary, a.film-poster")
});

/// Reads every labeled section of the index page in document order.
///
/// Unlabeled blocks and blocks without any item link are left out.
pub fn parse_sections(html: &str) -> SectionMap {
    let doc = Html::parse_document(html);
    let mut sections = SectionMap::new();

    for (position, block) in doc.select(&SECTION).enumerate() {
        let Some(label) = section_label(block) else {
            ::log::debug!("Skipping unlabeled section block #{}", position);
            continue;
        };

        let key = sanitize_key(&label);
        if key.is_empty() {
            ::log::debug!("Skipping section '{}': label yields an empty key", label);
            continue;
        }
        if key == FAILED_KEY {
            ::log::warn!("Skipping section '{}': key is reserved for failures", label);
            continue;
        }

        let items = section_items(block);
        if items.is_empty() {
            ::log::info!("Dropping section '{}': no items at index time", key);
            continue;
        }

        ::log::debug!("Section '{}' lists {} items", key, items.len());
        sections.insert(key, items);
    }

    sections
}

/// Slider blocks get the fixed label; others use their heading text
fn section_label(block: ElementRef<'_>) -> Option<String> {
    let is_spotlight =
        block.value().id() == Some("slider") || block.select(&SLIDER).next().is_some();
    if is_spotlight {
        return Some(SPOTLIGHT_LABEL.to_string());
    }

    block
        .select(&HEADER)
        .next()
        .map(element_text)
        .and_then(|t| text::non_empty(&t))
}

/// Normalized item references in page order, each kept once
fn section_items(block: ElementRef<'_>) -> Vec<WorkItem> {
    let mut items: Vec<WorkItem> = Vec::new();

    for entry in block.select(&ITEM) {
        let Some(href) = entry
            .select(&ITEM_LINK)
            .next()
            .and_then(|link| link.value().attr("href"))
        else {
            continue;
        };
        if href.trim().is_empty() {
            continue;
        }

        let item = WorkItem::from_href(href);
        if !items.contains(&item) {
            items.push(item);
        }
    }

    items
}
