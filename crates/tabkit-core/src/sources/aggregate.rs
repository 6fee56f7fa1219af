//! Merging local and synced tabs into a device-grouped list.

use super::enumerator::TabEnumerator;
use crate::cancel::CancellationToken;
use crate::config::DeviceConfig;
use crate::error::{Result, TabkitError};
use crate::models::{Device, LocalTab, RemoteTab, TabRecord};
use crate::store::{queries, ResilientQueryExecutor};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Group tabs by device.
///
/// The current device always comes first, even when it has no tabs. Remote
/// devices keep the order in which they first appear in `remote`, and any
/// remote device named `current_device_name` is dropped so this machine's
/// own synced copy does not show up twice.
pub fn aggregate(
    local: Vec<LocalTab>,
    remote: Vec<RemoteTab>,
    current_device_name: &str,
) -> Vec<Device> {
    let mut devices = vec![Device {
        id: DeviceConfig::CURRENT_DEVICE_ID.to_string(),
        name: DeviceConfig::CURRENT_DEVICE_LABEL.to_string(),
        is_current: true,
        tabs: local.into_iter().map(TabRecord::from).collect(),
    }];

    let mut slots: HashMap<String, usize> = HashMap::new();
    for tab in remote {
        if !current_device_name.is_empty() && tab.device_name == current_device_name {
            continue;
        }
        let slot = *slots.entry(tab.device_id.clone()).or_insert_with(|| {
            devices.push(Device {
                id: tab.device_id.clone(),
                name: tab.device_name.clone(),
                is_current: false,
                tabs: Vec::new(),
            });
            devices.len() - 1
        });
        devices[slot].tabs.push(tab.into());
    }

    devices
}

/// Which side of the merge failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    Remote,
}

/// A source that could not be read. The merge still completes without it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    pub source: SourceKind,
    #[serde(serialize_with = "error_message")]
    pub error: TabkitError,
}

fn error_message<S: Serializer>(
    error: &TabkitError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Devices plus whatever went wrong gathering them.
#[derive(Debug, Serialize)]
pub struct AggregateOutcome {
    pub devices: Vec<Device>,
    pub failures: Vec<SourceFailure>,
}

/// Collects tabs from the live enumerator and the synced-tabs database.
pub struct SourceAggregator {
    enumerator: Arc<dyn TabEnumerator>,
    executor: ResilientQueryExecutor,
    remote_db: Option<PathBuf>,
    current_device_name: String,
}

impl SourceAggregator {
    pub fn new(enumerator: Arc<dyn TabEnumerator>, executor: ResilientQueryExecutor) -> Self {
        Self {
            enumerator,
            executor,
            remote_db: None,
            current_device_name: String::new(),
        }
    }

    pub fn with_remote_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.remote_db = Some(path.into());
        self
    }

    pub fn with_current_device_name(mut self, name: impl Into<String>) -> Self {
        self.current_device_name = name.into();
        self
    }

    /// Read both sources concurrently and merge them.
    ///
    /// A failing source is reported in [`AggregateOutcome::failures`] rather
    /// than failing the whole call. Only cancellation is an error.
    pub async fn collect(&self, cancel: &CancellationToken) -> Result<AggregateOutcome> {
        let local = async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TabkitError::Cancelled),
                tabs = self.enumerator.list_tabs() => tabs,
            }
        };
        let remote = async {
            match &self.remote_db {
                Some(path) => self
                    .executor
                    .execute(path, &queries::remote_tabs(), cancel)
                    .await
                    .map(Some),
                None => Ok(None),
            }
        };

        let (local, remote) = tokio::join!(local, remote);
        cancel.check()?;

        let mut failures = Vec::new();
        let local = match local {
            Ok(tabs) => tabs,
            Err(error) => {
                warn!("Local tab enumeration failed: {}", error);
                failures.push(SourceFailure {
                    source: SourceKind::Local,
                    error,
                });
                Vec::new()
            }
        };
        let remote = match remote {
            Ok(tabs) => tabs.unwrap_or_default(),
            Err(error) => {
                warn!("Synced tabs unavailable: {}", error);
                failures.push(SourceFailure {
                    source: SourceKind::Remote,
                    error,
                });
                Vec::new()
            }
        };

        debug!(
            "Aggregating {} local and {} remote tabs",
            local.len(),
            remote.len()
        );
        Ok(AggregateOutcome {
            devices: aggregate(local, remote, &self.current_device_name),
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn local(title: &str, url: &str) -> LocalTab {
        LocalTab {
            title: title.into(),
            url: url.into(),
            window_id: 1,
            index: 0,
        }
    }

    fn remote(title: &str, device_id: &str, device_name: &str) -> RemoteTab {
        RemoteTab {
            title: title.into(),
            url: format!("https://{}.example", title.to_lowercase()),
            device_id: device_id.into(),
            device_name: device_name.into(),
        }
    }

    fn titles(device: &Device) -> Vec<&str> {
        device.tabs.iter().map(|t| t.title()).collect()
    }

    #[test]
    fn test_current_device_first_and_self_dropped() {
        let devices = aggregate(
            vec![local("Docs", "https://docs.example")],
            vec![
                remote("Mail", "d-1", "Laptop"),
                remote("Docs", "d-2", "Desk"),
            ],
            "Desk",
        );

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "This Device");
        assert!(devices[0].is_current);
        assert_eq!(titles(&devices[0]), vec!["Docs"]);
        assert_eq!(devices[1].name, "Laptop");
        assert!(!devices[1].is_current);
        assert_eq!(titles(&devices[1]), vec!["Mail"]);
    }

    #[test]
    fn test_current_device_present_without_tabs() {
        let devices = aggregate(vec![], vec![], "");
        assert_eq!(devices.len(), 1);
        assert!(devices[0].is_current);
        assert!(devices[0].tabs.is_empty());
    }

    #[test]
    fn test_groups_by_device_in_first_appearance_order() {
        let devices = aggregate(
            vec![],
            vec![
                remote("A", "d-2", "Phone"),
                remote("B", "d-1", "Laptop"),
                remote("C", "d-2", "Phone"),
            ],
            "",
        );
        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["This Device", "Phone", "Laptop"]);
        assert_eq!(titles(&devices[1]), vec!["A", "C"]);
    }

    #[test]
    fn test_empty_device_name_matches_nothing() {
        let devices = aggregate(vec![], vec![remote("A", "d-1", "")], "");
        assert_eq!(devices.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_no_device_named_current_and_ids_unique(
            tabs in proptest::collection::vec((0u8..4, 0u8..4), 0..40),
            current in 0u8..4,
        ) {
            let remote_tabs: Vec<RemoteTab> = tabs
                .iter()
                .map(|(id, name)| remote("T", &format!("d-{}", id), &format!("n-{}", name)))
                .collect();
            let current_name = format!("n-{}", current);
            let kept = remote_tabs.iter().filter(|t| t.device_name != current_name).count();

            let devices = aggregate(vec![], remote_tabs, &current_name);

            prop_assert!(devices[0].is_current);
            prop_assert!(devices[1..].iter().all(|d| d.name != current_name && !d.is_current));
            let ids: HashSet<_> = devices.iter().map(|d| d.id.as_str()).collect();
            prop_assert_eq!(ids.len(), devices.len());
            let total: usize = devices[1..].iter().map(|d| d.tabs.len()).sum();
            prop_assert_eq!(total, kept);
        }
    }

    struct FixedEnumerator(Result<Vec<LocalTab>>);

    #[async_trait]
    impl TabEnumerator for FixedEnumerator {
        async fn list_tabs(&self) -> Result<Vec<LocalTab>> {
            match &self.0 {
                Ok(tabs) => Ok(tabs.clone()),
                Err(e) => Err(TabkitError::Enumeration {
                    message: e.to_string(),
                }),
            }
        }
    }

    struct PendingEnumerator;

    #[async_trait]
    impl TabEnumerator for PendingEnumerator {
        async fn list_tabs(&self) -> Result<Vec<LocalTab>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_collect_without_remote_db() {
        let aggregator = SourceAggregator::new(
            Arc::new(FixedEnumerator(Ok(vec![local("Docs", "https://docs.example")]))),
            ResilientQueryExecutor::default(),
        );
        let outcome = aggregator.collect(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.devices.len(), 1);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_collect_reports_both_failures() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = SourceAggregator::new(
            Arc::new(FixedEnumerator(Err(TabkitError::Other("boom".into())))),
            ResilientQueryExecutor::default(),
        )
        .with_remote_db(dir.path().join("missing.db"));

        let outcome = aggregator.collect(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.devices.len(), 1);
        assert!(outcome.devices[0].tabs.is_empty());
        let sources: Vec<_> = outcome.failures.iter().map(|f| f.source).collect();
        assert_eq!(sources, vec![SourceKind::Local, SourceKind::Remote]);
        assert!(matches!(
            outcome.failures[1].error,
            TabkitError::FileNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_collect_cancelled() {
        let aggregator = SourceAggregator::new(
            Arc::new(PendingEnumerator),
            ResilientQueryExecutor::default(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = aggregator.collect(&cancel).await;
        assert!(matches!(result, Err(TabkitError::Cancelled)));
    }

    #[test]
    fn test_failure_serializes_message() {
        let failure = SourceFailure {
            source: SourceKind::Remote,
            error: TabkitError::Enumeration {
                message: "nope".into(),
            },
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["source"], "remote");
        assert!(json["error"].as_str().unwrap().contains("nope"));
    }
}
