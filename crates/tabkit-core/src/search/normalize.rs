//! Per-locale text normalization for search.
//!
//! Handlers are registered by locale name on a [`NormalizerRegistry`] that
//! is built once and passed by reference. A locale with no handler is not an
//! error: the caller falls back to the lowercased raw text.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Turns a candidate string into the form a query is matched against.
///
/// The query is passed along so a handler can pick a representation that
/// fits it (for example a phonetic Latin form when the query is Latin).
/// Such a handler must return `true` from
/// [`depends_on_query`](Self::depends_on_query); its output is then never
/// cached across queries.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, query: &str, candidate: &str) -> Result<String, String>;

    /// Whether the output for a candidate can change with the query.
    fn depends_on_query(&self) -> bool {
        false
    }
}

/// Lowercases the candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseFoldNormalizer;

impl Normalizer for CaseFoldNormalizer {
    fn normalize(&self, _query: &str, candidate: &str) -> Result<String, String> {
        Ok(candidate.to_lowercase())
    }
}

/// Locale name to handler.
#[derive(Clone, Default)]
pub struct NormalizerRegistry {
    handlers: HashMap<String, Arc<dyn Normalizer>>,
}

impl NormalizerRegistry {
    /// An empty registry. Every locale falls back to the raw form.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with [`CaseFoldNormalizer`] under the default locale.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            crate::config::SearchConfig::DEFAULT_LOCALE,
            Arc::new(CaseFoldNormalizer),
        );
        registry
    }

    /// Register `handler` for `locale`, replacing any previous one.
    pub fn register(&mut self, locale: impl Into<String>, handler: Arc<dyn Normalizer>) {
        self.handlers.insert(locale.into(), handler);
    }

    pub fn get(&self, locale: &str) -> Option<&Arc<dyn Normalizer>> {
        self.handlers.get(locale)
    }

    pub fn contains(&self, locale: &str) -> bool {
        self.handlers.contains_key(locale)
    }
}

impl fmt::Debug for NormalizerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut locales: Vec<_> = self.handlers.keys().collect();
        locales.sort();
        f.debug_struct("NormalizerRegistry")
            .field("locales", &locales)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    record: String,
    field: String,
    locale: String,
}

/// Normalized field strings for one search session.
///
/// Entries are only added while the session lives and the whole cache is
/// dropped when it ends.
#[derive(Debug, Default)]
pub struct NormalizationCache {
    entries: HashMap<CacheKey, String>,
}

impl NormalizationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, record: &str, field: &str, locale: &str) -> Option<&str> {
        self.entries
            .get(&CacheKey {
                record: record.to_string(),
                field: field.to_string(),
                locale: locale.to_string(),
            })
            .map(String::as_str)
    }

    pub fn insert(&mut self, record: &str, field: &str, locale: &str, value: String) {
        self.entries.insert(
            CacheKey {
                record: record.to_string(),
                field: field.to_string(),
                locale: locale.to_string(),
            },
            value,
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Normalizer for Upper {
        fn normalize(&self, _query: &str, candidate: &str) -> Result<String, String> {
            Ok(candidate.to_uppercase())
        }
    }

    #[test]
    fn test_with_defaults_registers_case_fold() {
        let registry = NormalizerRegistry::with_defaults();
        let handler = registry.get("default").unwrap();
        assert_eq!(handler.normalize("q", "GitHub").unwrap(), "github");
        assert!(registry.get("zh-CN").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = NormalizerRegistry::with_defaults();
        registry.register("default", Arc::new(Upper));
        assert_eq!(
            registry.get("default").unwrap().normalize("", "a").unwrap(),
            "A"
        );
        assert!(format!("{:?}", registry).contains("default"));
    }

    #[test]
    fn test_cache_keys_include_locale() {
        let mut cache = NormalizationCache::new();
        cache.insert("tab-1", "title", "default", "docs".into());
        assert_eq!(cache.get("tab-1", "title", "default"), Some("docs"));
        assert_eq!(cache.get("tab-1", "title", "ja"), None);
        assert_eq!(cache.get("tab-1", "url", "default"), None);

        cache.clear();
        assert!(cache.is_empty());
    }
}
