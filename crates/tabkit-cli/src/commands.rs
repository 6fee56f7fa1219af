//! Command implementations. Each returns the JSON value `main` prints.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabkit_core::config::SearchConfig;
use tabkit_core::paths::{self, ProfileFiles};
use tabkit_core::{
    decode_file, parse_session, queries, CancellationToken, NormalizationCache,
    NormalizerRegistry, Preferences, ResilientQueryExecutor, ScriptTabEnumerator, Searchable,
    SessionFileEnumerator, SourceAggregator, TabEnumerator, TabRecord, TabkitError, WeightedField,
    WeightedFuzzyIndex,
};
use tracing::debug;

pub struct TabsOptions {
    pub remote_db: Option<PathBuf>,
    pub device_name: Option<String>,
    pub session: Option<PathBuf>,
    pub browser: String,
    pub query: Option<String>,
}

pub struct BookmarkOptions {
    pub query: Option<String>,
    pub folder: Option<String>,
    pub limit: Option<u32>,
}

/// Places database to read: `db` when given, else the first profile
/// under the `app_dir` profiles directory.
pub fn places_db(db: Option<PathBuf>, app_dir: &str) -> Result<PathBuf> {
    if let Some(db) = db {
        return Ok(db);
    }
    let root = paths::profiles_dir(app_dir).ok_or_else(|| TabkitError::Config {
        message: "cannot locate the home directory; pass --db".into(),
    })?;
    Ok(first_places_db(&root).ok_or(TabkitError::FileNotFound(root))?)
}

fn first_places_db(root: &Path) -> Option<PathBuf> {
    paths::find_profiles(root)
        .into_iter()
        .next()
        .map(|profile| paths::profile_file(&profile, ProfileFiles::PLACES))
}

pub async fn decode(file: &Path, tabs: bool) -> Result<Value> {
    let document = decode_file(file).await?;
    if tabs {
        return Ok(serde_json::to_value(parse_session(&document)?.into_tabs())?);
    }
    match serde_json::from_slice(&document) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(
            String::from_utf8_lossy(&document).into_owned(),
        )),
    }
}

fn enumerator(prefs: &Preferences, options: &TabsOptions) -> Arc<dyn TabEnumerator> {
    if let Some(session) = &options.session {
        return Arc::new(SessionFileEnumerator::new(session));
    }
    match &prefs.enumerator_program {
        Some(program) => Arc::new(ScriptTabEnumerator::new(
            program.clone(),
            prefs.enumerator_args.clone().unwrap_or_default(),
        )),
        None => Arc::new(ScriptTabEnumerator::for_application(&options.browser)),
    }
}

fn remote_db(prefs: &Preferences, options: &TabsOptions) -> Option<PathBuf> {
    options
        .remote_db
        .clone()
        .or_else(|| prefs.remote_db.clone())
        .or_else(|| paths::cloud_tabs_db().filter(|path| path.is_file()))
}

pub async fn tabs(
    prefs: &Preferences,
    options: TabsOptions,
    cancel: &CancellationToken,
) -> Result<Value> {
    let executor = ResilientQueryExecutor::new(prefs.retry_policy());
    let mut aggregator = SourceAggregator::new(enumerator(prefs, &options), executor);
    if let Some(db) = remote_db(prefs, &options) {
        debug!("Reading synced tabs from {}", db.display());
        aggregator = aggregator.with_remote_db(db);
    }
    if let Some(name) = options.device_name.as_ref().or(prefs.device_name.as_ref()) {
        aggregator = aggregator.with_current_device_name(name.clone());
    }

    let outcome = aggregator.collect(cancel).await?;

    let Some(query) = options.query.as_deref() else {
        return Ok(serde_json::to_value(&outcome)?);
    };
    let records: Vec<TabRecord> = outcome
        .devices
        .iter()
        .flat_map(|device| device.tabs.iter().cloned())
        .collect();
    let fields = vec![
        WeightedField::new("title", SearchConfig::TITLE_WEIGHT)?,
        WeightedField::new("domain", SearchConfig::DOMAIN_WEIGHT)?,
        WeightedField::new("device", SearchConfig::DEVICE_WEIGHT)?,
    ];
    let mut ranked = rank(prefs, &records, &fields, query)?;
    if let Value::Object(map) = &mut ranked {
        map.insert("sourceFailures".into(), serde_json::to_value(&outcome.failures)?);
    }
    Ok(ranked)
}

pub async fn bookmarks(
    prefs: &Preferences,
    db: &Path,
    options: BookmarkOptions,
    cancel: &CancellationToken,
) -> Result<Value> {
    let executor = ResilientQueryExecutor::new(prefs.retry_policy());
    let folder = options.folder.as_deref().unwrap_or("");
    let rows = executor
        .execute(db, &queries::bookmarks(folder, options.limit), cancel)
        .await?;
    match options.query.as_deref() {
        Some(query) => rank(prefs, &rows, &WeightedField::defaults(), query),
        None => Ok(serde_json::to_value(rows)?),
    }
}

pub async fn history(
    prefs: &Preferences,
    db: &Path,
    query: Option<&str>,
    filter: Option<&str>,
    limit: Option<u32>,
    cancel: &CancellationToken,
) -> Result<Value> {
    let executor = ResilientQueryExecutor::new(prefs.retry_policy());
    let rows = executor
        .execute(db, &queries::history(filter.unwrap_or(""), limit), cancel)
        .await?;
    match query {
        Some(query) => rank(prefs, &rows, &WeightedField::defaults(), query),
        None => Ok(serde_json::to_value(rows)?),
    }
}

pub async fn workspaces(
    prefs: &Preferences,
    db: &Path,
    cancel: &CancellationToken,
) -> Result<Value> {
    let executor = ResilientQueryExecutor::new(prefs.retry_policy());
    let rows = executor.execute(db, &queries::workspaces(), cancel).await?;
    Ok(serde_json::to_value(rows)?)
}

fn rank<T: Searchable + Serialize>(
    prefs: &Preferences,
    records: &[T],
    fields: &[WeightedField],
    query: &str,
) -> Result<Value> {
    let registry = NormalizerRegistry::with_defaults();
    let index = WeightedFuzzyIndex::new(&registry)
        .with_locale(prefs.locale())
        .with_threshold(prefs.similarity_threshold());
    let results = index.search(records, fields, query, &mut NormalizationCache::new());
    let failures: Vec<String> = results.failures.iter().map(|e| e.to_string()).collect();
    let mut output = serde_json::Map::new();
    output.insert("hits".into(), serde_json::to_value(&results.hits)?);
    output.insert("failures".into(), serde_json::to_value(failures)?);
    Ok(Value::Object(output))
}
