//! Extraction of the rich ("watch") page: metadata plus player, servers and episodes.

use super::text::{self, WATCH_MORE_MARKER};
use super::{description_text, element_text, first_attr, first_text, selector};
use crate::results::{Episode, Record, ServerEntry, ServerGroups};
use crate::site::SiteLayout;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".anisc-detail .film-name a"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(".film-description .text"));
static POSTER: LazyLock<Selector> =
    LazyLock::new(|| selector(".anisc-poster .film-poster-img"));
static PLAYER: LazyLock<Selector> = LazyLock::new(|| selector("iframe#iframe-embed"));
static SERVER_BLOCK: LazyLock<Selector> = LazyLock::new(|| selector(".ps_-block"));
static SERVER_ITEM: LazyLock<Selector> = LazyLock::new(|| selector(".server-item"));
static EPISODE: LazyLock<Selector> = LazyLock::new(|| selector(".ss-list a.ssl-item.ep-item"));
static EPISODE_NAME: LazyLock<Selector> = LazyLock::new(|| selector(".ep-name"));

/// Class marking a server block as dubbed
const DUB_MARKER: &str = "servers-dub";

/// Extracts a rich record, or `None` when the page has no title.
///
/// Every other field is best-effort: a missing field leaves only that field
/// empty.
pub fn extract(html: &str, source_url: &str, site: &SiteLayout) -> Option<Record> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let Some(title) = first_text(root, &TITLE) else {
        ::log::debug!("Watch page for {} has no title", source_url);
        return None;
    };

    let description = description_text(root, &DESCRIPTION, WATCH_MORE_MARKER);

    let record = Record {
        title,
        source_url: source_url.to_string(),
        image_url: poster_url(root),
        description,
        streaming_pointer: first_attr(root, &PLAYER, "src"),
        server_groups: server_groups(root),
        episodes: episodes(root, site),
    };

    ::log::trace!(
        "Watch page {}: {} servers, {} episodes",
        source_url,
        record.server_groups.sub.len() + record.server_groups.dub.len(),
        record.episodes.len()
    );
    Some(record)
}

/// Poster image, falling back to the lazy-load attribute
pub(crate) fn poster_url(root: ElementRef<'_>) -> Option<String> {
    first_attr(root, &POSTER, "src").or_else(|| first_attr(root, &POSTER, "data-src"))
}

/// Servers grouped by block; blocks without the dub marker count as sub
pub fn server_groups(root: ElementRef<'_>) -> ServerGroups {
    let mut groups = ServerGroups::default();

    for block in root.select(&SERVER_BLOCK) {
        let is_dub = block
            .value()
            .attr("class")
            .is_some_and(|class| class.contains(DUB_MARKER));
        let target = if is_dub {
            &mut groups.dub
        } else {
            &mut groups.sub
        };

        for item in block.select(&SERVER_ITEM) {
            target.push(ServerEntry {
                name: element_text(item),
                identifier: item.value().attr("data-id").map(str::to_string),
            });
        }
    }

    groups
}

/// Episodes in document order; the number is copied verbatim
pub fn episodes(root: ElementRef<'_>, site: &SiteLayout) -> Vec<Episode> {
    root.select(&EPISODE)
        .map(|item| {
            let title = first_text(item, &EPISODE_NAME)
                .or_else(|| item.value().attr("title").and_then(text::non_empty))
                .unwrap_or_default();
            Episode {
                number: item.value().attr("data-number").map(str::to_string),
                title,
                url: item.value().attr("href").and_then(|href| site.resolve(href)),
            }
        })
        .collect()
}
