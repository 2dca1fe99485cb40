use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Reference to one catalog entry, as a site-relative locator (e.g. `/one-piece-100`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItem(String);

impl WorkItem {
    /// Build a work item from a raw link, rewriting `/watch/` to the base form
    /// so that both page variants resolve from the same reference.
    pub fn from_href(href: &str) -> Self {
        Self(href.trim().replace("/watch/", "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkItem {
    fn from(value: &str) -> Self {
        Self::from_href(value)
    }
}

/// URL layout of the catalog site
#[derive(Debug, Clone)]
pub struct SiteLayout {
    base: Url,
    home_path: String,
    watch_prefix: String,
}

impl SiteLayout {
    pub fn new(base: Url, home_path: &str, watch_prefix: &str) -> Self {
        Self {
            base,
            home_path: home_path.to_string(),
            watch_prefix: watch_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn parse(base: &str, home_path: &str, watch_prefix: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(base)?, home_path, watch_prefix))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Origin string sent as the referer, without a trailing slash
    pub fn origin(&self) -> String {
        self.base.as_str().trim_end_matches('/').to_string()
    }

    pub fn home_url(&self) -> Result<Url, url::ParseError> {
        self.base.join(&self.home_path)
    }

    /// Rich page: watch prefix joined with the locator, query stripped
    pub fn rich_url(&self, item: &WorkItem) -> Result<Url, url::ParseError> {
        let locator = item.as_str().split('?').next().unwrap_or_default();
        let path = if locator.starts_with('/') {
            format!("{}{}", self.watch_prefix, locator)
        } else {
            format!("{}/{}", self.watch_prefix, locator)
        };
        self.base.join(&path)
    }

    /// Degraded page: the locator resolved directly against the base
    pub fn degraded_url(&self, item: &WorkItem) -> Result<Url, url::ParseError> {
        self.base.join(item.as_str())
    }

    /// Resolve any link found in a page against the base
    pub fn resolve(&self, href: &str) -> Option<String> {
        self.base.join(href).ok().map(|u| u.to_string())
    }
}
