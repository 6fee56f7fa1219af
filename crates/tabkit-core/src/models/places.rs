//! Records read from a browser profile's places database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmarked page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: String,
    /// Title of the containing folder.
    pub folder: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One visit to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub visited_at: Option<DateTime<Utc>>,
}

/// A browser workspace (a named group of tabs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub uuid: String,
    pub name: String,
    pub icon: Option<String>,
    pub position: i64,
    pub is_default: bool,
}

/// Convert a PRTime value (microseconds since the epoch).
pub fn from_prtime(micros: i64) -> Option<DateTime<Utc>> {
    if micros <= 0 {
        return None;
    }
    DateTime::from_timestamp_micros(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_prtime() {
        let dt = from_prtime(1_700_000_000_000_000).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert!(from_prtime(0).is_none());
        assert!(from_prtime(-5).is_none());
    }
}
