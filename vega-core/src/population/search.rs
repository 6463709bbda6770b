//! Relevance-ranked search over parsed indexes
//!
//! Scores are fixed tiers in `[0, 1]`:
//!
//! | match                              | skill / persona | profile |
//! |------------------------------------|-----------------|---------|
//! | exact name                         | 1.0             | 1.0     |
//! | name contains query                | 0.8             | 0.8     |
//! | a tag equals query                 | 0.7             | -       |
//! | a tag contains query               | 0.6             | -       |
//! | description contains query         | 0.5             | 0.5     |
//! | a referenced skill/persona matches | -               | 0.4     |
//!
//! A score of zero excludes the entry. Results are ordered by descending
//! score, then ascending name.

use serde::Serialize;
use std::cmp::Ordering;

use super::{Index, IndexEntry, ItemKind, ProfileIndexEntry};

/// Search filters
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Only search this kind (all kinds when `None`)
    pub kind: Option<ItemKind>,

    /// Keep only entries carrying at least one of these tags
    pub tags: Vec<String>,

    /// Maximum number of results (`None` or `Some(0)` for all)
    pub limit: Option<usize>,
}

impl SearchOptions {
    /// The kinds this search covers, in search order
    pub fn kinds(&self) -> Vec<ItemKind> {
        match self.kind {
            Some(kind) => vec![kind],
            None => ItemKind::ALL.to_vec(),
        }
    }

    fn tag_filter(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// A scored match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub kind: ItemKind,
    pub name: String,
    pub version: String,
    pub description: String,
    pub tags: Vec<String>,
    pub score: f64,
}

/// Score a skill or persona entry
///
/// `query` and `filter_tags` must already be lower-cased.
pub fn score_entry(query: &str, name: &str, entry: &IndexEntry, filter_tags: &[String]) -> f64 {
    let tags: Vec<String> = entry.tags.iter().map(|t| t.to_lowercase()).collect();

    if !filter_tags.is_empty() && !tags.iter().any(|t| filter_tags.contains(t)) {
        return 0.0;
    }

    let name = name.to_lowercase();
    if name == query {
        return 1.0;
    }

    let mut score: f64 = 0.0;

    if name.contains(query) {
        score = 0.8;
    }

    if tags.iter().any(|t| t == query) {
        score = score.max(0.7);
    }

    if tags.iter().any(|t| t.contains(query)) {
        score = score.max(0.6);
    }

    if entry.description.to_lowercase().contains(query) {
        score = score.max(0.5);
    }

    score
}

/// Score a profile entry
///
/// Profiles carry no tags, so any tag filter excludes them.
pub fn score_profile(
    query: &str,
    name: &str,
    entry: &ProfileIndexEntry,
    filter_tags: &[String],
) -> f64 {
    if !filter_tags.is_empty() {
        return 0.0;
    }

    let name = name.to_lowercase();
    if name == query {
        return 1.0;
    }

    let mut score: f64 = 0.0;

    if name.contains(query) {
        score = 0.8;
    }

    if entry.description.to_lowercase().contains(query) {
        score = score.max(0.5);
    }

    if entry.skills.iter().any(|s| s.to_lowercase().contains(query)) {
        score = score.max(0.4);
    }

    if entry.persona.to_lowercase().contains(query) {
        score = score.max(0.4);
    }

    score
}

/// Score every entry of an index, keeping the non-zero ones (unranked)
pub fn search_index(index: &Index, query: &str, options: &SearchOptions) -> Vec<SearchResult> {
    let query = query.to_lowercase();
    let filter_tags = options.tag_filter();

    match index {
        Index::Entries { kind, entries } => entries
            .iter()
            .filter_map(|(name, entry)| {
                let score = score_entry(&query, name, entry, &filter_tags);
                (score > 0.0).then(|| SearchResult {
                    kind: *kind,
                    name: name.clone(),
                    version: entry.version.clone(),
                    description: entry.description.clone(),
                    tags: entry.tags.clone(),
                    score,
                })
            })
            .collect(),
        Index::Profiles(profiles) => profiles
            .iter()
            .filter_map(|(name, entry)| {
                let score = score_profile(&query, name, entry, &filter_tags);
                (score > 0.0).then(|| SearchResult {
                    kind: ItemKind::Profile,
                    name: name.clone(),
                    version: entry.version.clone(),
                    description: entry.description.clone(),
                    tags: Vec::new(),
                    score,
                })
            })
            .collect(),
    }
}

/// Total order on results: score descending, then name, then kind
fn compare(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.kind.cmp(&b.kind))
}

/// Sort results and apply the limit
pub fn rank(mut results: Vec<SearchResult>, limit: Option<usize>) -> Vec<SearchResult> {
    results.sort_by(compare);

    if let Some(limit) = limit.filter(|&n| n > 0) {
        results.truncate(limit);
    }

    results
}
