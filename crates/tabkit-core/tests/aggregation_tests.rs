//! Integration tests for merging enumerated tabs with a synced-tabs database.

use async_trait::async_trait;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabkit_core::{
    CancellationToken, LocalTab, NormalizerRegistry, ResilientQueryExecutor,
    RetryPolicy, SearchSession, SourceAggregator, SourceKind, TabEnumerator, TabRecord,
    TabkitError, WeightedField, WeightedFuzzyIndex,
};
use tempfile::TempDir;

struct FakeEnumerator {
    tabs: Vec<LocalTab>,
    fail: bool,
}

#[async_trait]
impl TabEnumerator for FakeEnumerator {
    async fn list_tabs(&self) -> tabkit_core::Result<Vec<LocalTab>> {
        if self.fail {
            return Err(TabkitError::Enumeration {
                message: "Safari is not running".into(),
            });
        }
        Ok(self.tabs.clone())
    }
}

fn local_docs() -> Vec<LocalTab> {
    vec![LocalTab {
        title: "Docs".into(),
        url: "https://docs.example".into(),
        window_id: 1,
        index: 0,
    }]
}

/// Create a synced-tabs database with the given `(device_id, device_name, title, url)` rows.
fn create_cloud_tabs(dir: &Path, rows: &[(&str, &str, &str, &str)]) -> PathBuf {
    let path = dir.join("CloudTabs.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE cloud_tab_devices (device_uuid TEXT PRIMARY KEY, device_name TEXT);
         CREATE TABLE cloud_tabs (tab_uuid TEXT PRIMARY KEY, device_uuid TEXT, title TEXT,
             url TEXT);",
    )
    .unwrap();
    for (i, (device_id, device_name, title, url)) in rows.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO cloud_tab_devices VALUES (?1, ?2)",
            (device_id, device_name),
        )
        .unwrap();
        conn.execute(
            "INSERT INTO cloud_tabs VALUES (?1, ?2, ?3, ?4)",
            (format!("tab-{}", i), device_id, title, url),
        )
        .unwrap();
    }
    path
}

fn fast_executor() -> ResilientQueryExecutor {
    ResilientQueryExecutor::new(
        RetryPolicy::new()
            .with_max_attempts(3)
            .with_base_delay(std::time::Duration::from_millis(1)),
    )
}

#[tokio::test]
async fn test_this_device_then_laptop() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = create_cloud_tabs(
        temp_dir.path(),
        &[
            ("d-laptop", "Laptop", "Mail", "https://mail.example"),
            ("d-self", "My Mac", "Docs", "https://docs.example"),
        ],
    );

    let aggregator = SourceAggregator::new(
        Arc::new(FakeEnumerator {
            tabs: local_docs(),
            fail: false,
        }),
        fast_executor(),
    )
    .with_remote_db(&db)
    .with_current_device_name("My Mac");

    let outcome = aggregator.collect(&CancellationToken::new()).await.unwrap();
    assert!(outcome.failures.is_empty());

    let summary: Vec<(String, Vec<String>)> = outcome
        .devices
        .iter()
        .map(|d| {
            (
                d.name.clone(),
                d.tabs.iter().map(|t| t.title().to_string()).collect(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("This Device".to_string(), vec!["Docs".to_string()]),
            ("Laptop".to_string(), vec!["Mail".to_string()]),
        ]
    );
    assert!(outcome.devices[0].tabs[0].is_actionable());
    assert!(!outcome.devices[1].tabs[0].is_actionable());
}

#[tokio::test]
async fn test_enumerator_failure_degrades_to_empty_current_device() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = create_cloud_tabs(
        temp_dir.path(),
        &[("d-phone", "Phone", "News", "https://news.example")],
    );

    let aggregator = SourceAggregator::new(
        Arc::new(FakeEnumerator {
            tabs: Vec::new(),
            fail: true,
        }),
        fast_executor(),
    )
    .with_remote_db(&db);

    let outcome = aggregator.collect(&CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.devices.len(), 2);
    assert!(outcome.devices[0].is_current);
    assert!(outcome.devices[0].tabs.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].source, SourceKind::Local);
}

#[tokio::test]
async fn test_locked_remote_database_degrades_to_local_only() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = create_cloud_tabs(
        temp_dir.path(),
        &[("d-laptop", "Laptop", "Mail", "https://mail.example")],
    );
    let holder = Connection::open(&db).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let aggregator = SourceAggregator::new(
        Arc::new(FakeEnumerator {
            tabs: local_docs(),
            fail: false,
        }),
        fast_executor(),
    )
    .with_remote_db(&db);

    let outcome = aggregator.collect(&CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.devices.len(), 1);
    assert_eq!(outcome.devices[0].tabs.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].source, SourceKind::Remote);
    assert!(matches!(
        outcome.failures[0].error,
        TabkitError::ExhaustedRetries { attempts: 3, .. }
    ));

    holder.execute_batch("COMMIT;").unwrap();
}

#[tokio::test]
async fn test_collect_then_rank_within_session() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = create_cloud_tabs(
        temp_dir.path(),
        &[
            ("d-laptop", "Laptop", "Mail", "https://mail.example"),
            ("d-laptop", "Laptop", "Rust docs", "https://doc.rust-lang.org"),
        ],
    );
    let aggregator = SourceAggregator::new(
        Arc::new(FakeEnumerator {
            tabs: local_docs(),
            fail: false,
        }),
        fast_executor(),
    )
    .with_remote_db(&db);

    let session = SearchSession::new();
    let ticket = session.begin();
    let outcome = aggregator.collect(ticket.token()).await.unwrap();
    let tabs: Vec<TabRecord> = outcome.devices.into_iter().flat_map(|d| d.tabs).collect();

    let registry = NormalizerRegistry::with_defaults();
    let titles: Vec<String> = {
        let mut cache = session.cache();
        let results = WeightedFuzzyIndex::new(&registry).search(
            &tabs,
            &WeightedField::defaults(),
            "docs",
            &mut cache,
        );
        results.records().map(|t| t.title().to_string()).collect()
    };

    assert_eq!(
        session.publish(&ticket, titles),
        Some(vec!["Docs".to_string(), "Rust docs".to_string()])
    );
    assert!(!session.cache().is_empty());
    session.end();
    assert!(session.cache().is_empty());
}
