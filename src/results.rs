use crate::site::WorkItem;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

/// Reserved document key listing items that never succeeded
pub const FAILED_KEY: &str = "_failed";

/// Which extraction path produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Rich,
    Degraded,
}

/// One server offered for streaming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub name: String,
    pub identifier: Option<String>,
}

/// Servers grouped by audio track
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGroups {
    pub sub: Vec<ServerEntry>,
    pub dub: Vec<ServerEntry>,
}

impl ServerGroups {
    pub fn is_empty(&self) -> bool {
        self.sub.is_empty() && self.dub.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Copied verbatim from the page
    pub number: Option<String>,
    pub title: String,
    pub url: Option<String>,
}

/// Extracted catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,

    #[serde(rename = "sourceURL")]
    pub source_url: String,

    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,

    pub description: String,

    #[serde(rename = "streamingPointer")]
    pub streaming_pointer: Option<String>,

    #[serde(rename = "serverGroups")]
    pub server_groups: ServerGroups,

    pub episodes: Vec<Episode>,
}

impl Record {
    /// A record carrying only the basic metadata of the degraded page
    pub fn degraded(
        title: String,
        source_url: String,
        image_url: Option<String>,
        description: String,
    ) -> Self {
        Self {
            title,
            source_url,
            image_url,
            description,
            streaming_pointer: None,
            server_groups: ServerGroups::default(),
            episodes: Vec::new(),
        }
    }

    /// Only records with a non-empty title may be stored
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// One labeled block of the index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub key: String,
    pub items: Vec<WorkItem>,
}

/// Sections in index-page order, each with its items in page order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    sections: Vec<Section>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a section; a repeated key replaces the earlier items in place
    pub fn insert(&mut self, key: String, items: Vec<WorkItem>) {
        if let Some(existing) = self.sections.iter_mut().find(|s| s.key == key) {
            ::log::debug!("Section '{}' appears twice, keeping the later block", key);
            existing.items = items;
        } else {
            self.sections.push(Section { key, items });
        }
    }

    pub fn get(&self, key: &str) -> Option<&[WorkItem]> {
        self.sections
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.items.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Union of all items, deduplicated, in first-appearance order
    pub fn work_set(&self) -> Vec<WorkItem> {
        let mut seen = std::collections::HashSet::new();
        self.sections
            .iter()
            .flat_map(|s| s.items.iter())
            .filter(|item| seen.insert((*item).clone()))
            .cloned()
            .collect()
    }
}

/// A stored success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub record: Record,
    pub tier: Tier,
}

/// Accumulator owned by the orchestrator for one crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    records: HashMap<WorkItem, Acquired>,
    failed: Vec<WorkItem>,
    rounds_run: usize,
}

impl CrawlResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a success. Returns false if the item already had a record.
    pub(crate) fn insert_success(&mut self, item: WorkItem, record: Record, tier: Tier) -> bool {
        if self.records.contains_key(&item) {
            return false;
        }
        self.failed.retain(|f| f != &item);
        self.records.insert(item, Acquired { record, tier });
        true
    }

    pub(crate) fn set_failed(&mut self, failed: Vec<WorkItem>) {
        self.failed = failed;
    }

    pub(crate) fn set_rounds_run(&mut self, rounds: usize) {
        self.rounds_run = rounds;
    }

    pub fn get(&self, item: &WorkItem) -> Option<&Acquired> {
        self.records.get(item)
    }

    pub fn contains(&self, item: &WorkItem) -> bool {
        self.records.contains_key(item)
    }

    pub fn success_count(&self) -> usize {
        self.records.len()
    }

    pub fn count_tier(&self, tier: Tier) -> usize {
        self.records.values().filter(|a| a.tier == tier).count()
    }

    /// Items that never succeeded, in work-set order
    pub fn failed(&self) -> &[WorkItem] {
        &self.failed
    }

    /// Number of passes actually executed
    pub fn rounds_run(&self) -> usize {
        self.rounds_run
    }
}

/// Output document: section key to records, plus the failure list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalDocument {
    pub sections: Vec<(String, Vec<Record>)>,
    pub failed: Vec<WorkItem>,
}

impl FinalDocument {
    /// Join crawl results against the section map, keeping index order
    pub fn assemble(sections: &SectionMap, result: &CrawlResult) -> Self {
        let mut assembled = Vec::with_capacity(sections.len());

        for section in sections.iter() {
            let mut records = Vec::with_capacity(section.items.len());
            for item in &section.items {
                match result.get(item) {
                    Some(acquired) => records.push(acquired.record.clone()),
                    None => ::log::debug!(
                        "Omitting {} from section '{}': never acquired",
                        item,
                        section.key
                    ),
                }
            }
            if records.len() < section.items.len() {
                ::log::info!(
                    "Section '{}': {} of {} items acquired",
                    section.key,
                    records.len(),
                    section.items.len()
                );
            }
            assembled.push((section.key.clone(), records));
        }

        Self {
            sections: assembled,
            failed: result.failed().to_vec(),
        }
    }

    pub fn section(&self, key: &str) -> Option<&[Record]> {
        self.sections
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, records)| records.as_slice())
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

impl Serialize for FinalDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(!self.failed.is_empty());
        let mut map = serializer.serialize_map(Some(self.sections.len() + extra))?;
        for (key, records) in &self.sections {
            map.serialize_entry(key, records)?;
        }
        if !self.failed.is_empty() {
            map.serialize_entry(FAILED_KEY, &self.failed)?;
        }
        map.end()
    }
}
