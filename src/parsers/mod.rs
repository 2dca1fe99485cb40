//! Markup queries for the three page shapes of the catalog site.
//!
//! Every extractor here is a pure function of an already-fetched HTML body.
//! Documents are parsed and dropped inside the call, so nothing non-`Send`
//! escapes into the async layers.

pub mod detail;
pub mod home;
pub mod text;
pub mod watch;


use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Compiles a selector literal. Only called with static strings.
pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

static TITLE_TAG: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));

/// Normalized text of the first element matching `sel` under `scope`
pub(crate) fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope
        .select(sel)
        .next()
        .map(element_text)
        .and_then(|t| text::non_empty(&t))
}

/// Attribute value of the first element matching `sel` under `scope`
pub(crate) fn first_attr(scope: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    scope
        .select(sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .and_then(text::non_empty)
}

/// Description text of the first element matching `sel`, truncation marker removed.
///
/// Inline children (a "Read more" span, say) are read as part of the same run
/// of text, so the marker matches even when it is split across elements.
pub(crate) fn description_text(scope: ElementRef<'_>, sel: &Selector, marker: &str) -> String {
    scope
        .select(sel)
        .next()
        .map(|el| text::clean_description(&text::concat_fragments(el.text()), marker))
        .unwrap_or_default()
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    text::join_fragments(el.text())
}

/// Detects an error page served with a success status
pub fn looks_like_not_found(html: &str) -> bool {
    let doc = Html::parse_document(html);

    let title_says_404 = doc
        .select(&TITLE_TAG)
        .next()
        .map(element_text)
        .is_some_and(|t| t.contains("404"));

    title_says_404
        || doc
            .select(&BODY)
            .next()
            .map(element_text)
            .is_some_and(|body| body.contains("Page not found"))
}
