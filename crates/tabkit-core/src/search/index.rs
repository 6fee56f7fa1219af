//! Weighted fuzzy ranking over tabs, bookmarks, history and workspaces.

use super::fuzzy::similarity;
use super::normalize::{NormalizationCache, NormalizerRegistry};
use crate::config::SearchConfig;
use crate::error::{Result, TabkitError};
use crate::models::{url_domain, Bookmark, HistoryEntry, TabRecord, Workspace};
use serde::Serialize;
use std::borrow::Cow;
use std::cmp::Ordering;
use tracing::debug;

/// A record field and how much a match on it counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedField {
    name: String,
    weight: f64,
}

impl WeightedField {
    /// Fails unless `weight` is finite and positive.
    pub fn new(name: impl Into<String>, weight: f64) -> Result<Self> {
        let name = name.into();
        if !weight.is_finite() || weight <= 0.0 {
            return Err(TabkitError::Config {
                message: format!("weight for field '{}' must be positive, got {}", name, weight),
            });
        }
        Ok(Self { name, weight })
    }

    /// Get the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the field weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Title 3, domain 1, folder 0.5.
    pub fn defaults() -> Vec<WeightedField> {
        vec![
            WeightedField {
                name: "title".into(),
                weight: SearchConfig::TITLE_WEIGHT,
            },
            WeightedField {
                name: "domain".into(),
                weight: SearchConfig::DOMAIN_WEIGHT,
            },
            WeightedField {
                name: "folder".into(),
                weight: SearchConfig::FOLDER_WEIGHT,
            },
        ]
    }
}

/// A record the index can rank.
pub trait Searchable {
    /// Stable identity used to key normalized strings in the session cache.
    fn record_key(&self) -> String;

    /// Raw text of the named field, or `None` when the record has no such
    /// field or it is empty.
    fn field_value(&self, field: &str) -> Option<Cow<'_, str>>;
}

fn non_empty(value: &str) -> Option<Cow<'_, str>> {
    (!value.is_empty()).then_some(Cow::Borrowed(value))
}

impl Searchable for TabRecord {
    fn record_key(&self) -> String {
        match self {
            TabRecord::Local(tab) => format!("local:{}:{}:{}", tab.window_id, tab.index, tab.url),
            TabRecord::Remote(tab) => format!("remote:{}:{}", tab.device_id, tab.url),
        }
    }

    fn field_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "title" => non_empty(self.title()),
            "url" => non_empty(self.url()),
            "domain" => url_domain(self.url()).map(Cow::Owned),
            "device" => match self {
                TabRecord::Remote(tab) => non_empty(&tab.device_name),
                TabRecord::Local(_) => None,
            },
            _ => None,
        }
    }
}

impl Searchable for Bookmark {
    fn record_key(&self) -> String {
        format!("bookmark:{}", self.id)
    }

    fn field_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "title" => non_empty(&self.title),
            "url" => non_empty(&self.url),
            "domain" => url_domain(&self.url).map(Cow::Owned),
            "folder" => self.folder.as_deref().and_then(non_empty),
            _ => None,
        }
    }
}

impl Searchable for HistoryEntry {
    fn record_key(&self) -> String {
        let visited = self.visited_at.map(|t| t.timestamp_micros()).unwrap_or(0);
        format!("history:{}:{}", visited, self.url)
    }

    fn field_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "title" => non_empty(&self.title),
            "url" => non_empty(&self.url),
            "domain" => url_domain(&self.url).map(Cow::Owned),
            _ => None,
        }
    }
}

impl Searchable for Workspace {
    fn record_key(&self) -> String {
        format!("workspace:{}", self.uuid)
    }

    fn field_value(&self, field: &str) -> Option<Cow<'_, str>> {
        match field {
            "name" | "title" => non_empty(&self.name),
            _ => None,
        }
    }
}

/// A ranked record.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit<'a, T> {
    pub score: f64,
    pub record: &'a T,
}

/// Ranked hits plus records skipped because a field failed to normalize.
#[derive(Debug)]
pub struct SearchResults<'a, T> {
    pub hits: Vec<SearchHit<'a, T>>,
    pub failures: Vec<TabkitError>,
}

impl<'a, T> SearchResults<'a, T> {
    pub fn records(&self) -> impl Iterator<Item = &'a T> + '_ {
        self.hits.iter().map(|hit| hit.record)
    }
}

/// Fuzzy ranking with per-field weights and locale-aware normalization.
#[derive(Debug, Clone)]
pub struct WeightedFuzzyIndex<'r> {
    registry: &'r NormalizerRegistry,
    locale: String,
    threshold: f64,
}

impl<'r> WeightedFuzzyIndex<'r> {
    /// Create an index over `registry` with the default locale and threshold.
    pub fn new(registry: &'r NormalizerRegistry) -> Self {
        Self {
            registry,
            locale: SearchConfig::DEFAULT_LOCALE.to_string(),
            threshold: SearchConfig::SIMILARITY_THRESHOLD,
        }
    }

    /// Set the locale whose normalizer is applied.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Set the similarity below which a field does not contribute.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Get the locale whose normalizer is applied.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Get the similarity threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Rank `records` against `query`.
    ///
    /// An empty query returns every record in its original order. Otherwise
    /// records scoring zero are left out and the rest are ordered by
    /// descending score, ties keeping input order.
    pub fn search<'a, T: Searchable>(
        &self,
        records: &'a [T],
        fields: &[WeightedField],
        query: &str,
        cache: &mut NormalizationCache,
    ) -> SearchResults<'a, T> {
        let query = query.trim();
        if query.is_empty() {
            return SearchResults {
                hits: records
                    .iter()
                    .map(|record| SearchHit { score: 0.0, record })
                    .collect(),
                failures: Vec::new(),
            };
        }

        let query = query.to_lowercase();
        let mut hits = Vec::new();
        let mut failures = Vec::new();

        for record in records {
            match self.score(record, fields, &query, cache) {
                Ok(score) if score > 0.0 => hits.push(SearchHit { score, record }),
                Ok(_) => {}
                Err(error) => {
                    debug!("Excluding record from search: {}", error);
                    failures.push(error);
                }
            }
        }

        // `sort_by` is stable, so equal scores keep input order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        debug!(
            "Search for '{}' matched {} of {} records",
            query,
            hits.len(),
            records.len()
        );
        SearchResults { hits, failures }
    }

    fn score<T: Searchable>(
        &self,
        record: &T,
        fields: &[WeightedField],
        query: &str,
        cache: &mut NormalizationCache,
    ) -> Result<f64> {
        let key = record.record_key();
        let mut score = 0.0;
        for field in fields {
            let Some(normalized) = self.normalized(record, &key, field.name(), query, cache)?
            else {
                continue;
            };
            let strength = similarity(query, &normalized);
            if strength >= self.threshold {
                score += field.weight() * strength;
            }
        }
        Ok(score)
    }

    fn normalized<T: Searchable>(
        &self,
        record: &T,
        key: &str,
        field: &str,
        query: &str,
        cache: &mut NormalizationCache,
    ) -> Result<Option<String>> {
        let handler = self.registry.get(&self.locale);
        let cacheable = handler.map_or(true, |h| !h.depends_on_query());
        if cacheable {
            if let Some(cached) = cache.get(key, field, &self.locale) {
                return Ok(Some(cached.to_string()));
            }
        }
        let Some(raw) = record.field_value(field) else {
            return Ok(None);
        };
        let normalized = match handler {
            Some(handler) => handler.normalize(query, &raw).map_err(|message| {
                TabkitError::SearchNormalization {
                    record: key.to_string(),
                    field: field.to_string(),
                    message,
                }
            })?,
            None => raw.to_lowercase(),
        };
        if cacheable {
            cache.insert(key, field, &self.locale, normalized.clone());
        }
        Ok(Some(normalized))
    }
}
