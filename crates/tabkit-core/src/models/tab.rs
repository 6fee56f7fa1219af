//! Tab and device types.

use serde::{Deserialize, Serialize};

/// A tab open in a window on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalTab {
    pub title: String,
    pub url: String,
    pub window_id: i64,
    /// Position of the tab within its window.
    pub index: usize,
}

/// A tab open on another device, read from the synced-tabs database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTab {
    pub title: String,
    pub url: String,
    pub device_id: String,
    pub device_name: String,
}

/// A tab from either source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum TabRecord {
    Local(LocalTab),
    Remote(RemoteTab),
}

impl TabRecord {
    pub fn title(&self) -> &str {
        match self {
            TabRecord::Local(tab) => &tab.title,
            TabRecord::Remote(tab) => &tab.title,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            TabRecord::Local(tab) => &tab.url,
            TabRecord::Remote(tab) => &tab.url,
        }
    }

    /// Only local tabs can be focused in a window.
    pub fn is_actionable(&self) -> bool {
        matches!(self, TabRecord::Local(_))
    }
}

impl From<LocalTab> for TabRecord {
    fn from(tab: LocalTab) -> Self {
        TabRecord::Local(tab)
    }
}

impl From<RemoteTab> for TabRecord {
    fn from(tab: RemoteTab) -> Self {
        TabRecord::Remote(tab)
    }
}

/// Tabs grouped under one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    /// Set only for the synthetic entry holding this machine's tabs.
    pub is_current: bool,
    pub tabs: Vec<TabRecord>,
}
