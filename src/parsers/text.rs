/// Truncation marker left by the watch page's description widget
pub const WATCH_MORE_MARKER: &str = "... + More";

/// Truncation marker left by the detail page's description widget
pub const DETAIL_MORE_MARKER: &str = "...Read more";

/// Collapses every run of whitespace into a single space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Joins the text nodes of an element the way a browser would read them out
pub fn join_fragments<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    collapse_whitespace(&fragments.collect::<Vec<_>>().join(" "))
}

/// Concatenates text nodes as they appear in the markup, with no separator
/// between inline elements, then normalizes whitespace
pub fn concat_fragments<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    collapse_whitespace(&fragments.collect::<String>())
}

/// Removes every occurrence of `marker`, then normalizes whitespace
pub fn clean_description(raw: &str, marker: &str) -> String {
    let stripped = if marker.is_empty() {
        raw.to_string()
    } else {
        raw.replace(marker, "")
    };
    collapse_whitespace(&stripped)
}

/// Returns `None` for blank strings, the trimmed value otherwise
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
