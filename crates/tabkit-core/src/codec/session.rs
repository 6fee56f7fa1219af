//! Session-store documents carried inside decoded frames.
//!
//! Only the parts needed for a point-in-time tab snapshot are modelled:
//! windows, their tabs, and each tab's current history entry.

use super::frame;
use crate::error::Result;
use crate::models::LocalTab;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSession {
    windows: Vec<RawWindow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWindow {
    tabs: Vec<RawTab>,
    selected: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTab {
    entries: Vec<RawEntry>,
    /// 1-based index of the current entry.
    index: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntry {
    url: String,
    title: Option<String>,
}

/// One browser window in a session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionWindow {
    /// Tabs with history. Each keeps its position among all of the
    /// window's tabs in `index`, so positions can have gaps.
    pub tabs: Vec<LocalTab>,
    /// 1-based position of the focused tab, when recorded.
    pub selected: Option<usize>,
}

impl SessionWindow {
    /// The focused tab, if it was recorded and has history.
    pub fn selected_tab(&self) -> Option<&LocalTab> {
        let position = self.selected?.checked_sub(1)?;
        self.tabs.iter().find(|tab| tab.index == position)
    }
}

/// Point-in-time view of the open tabs recorded in a session file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub windows: Vec<SessionWindow>,
}

impl SessionSnapshot {
    /// All tabs across all windows, window by window.
    pub fn into_tabs(self) -> Vec<LocalTab> {
        self.windows.into_iter().flat_map(|w| w.tabs).collect()
    }
}

/// Parse a decoded session document.
pub fn parse_session(document: &[u8]) -> Result<SessionSnapshot> {
    let raw: RawSession = serde_json::from_slice(document)?;

    let windows = raw
        .windows
        .into_iter()
        .enumerate()
        .map(|(window_idx, window)| SessionWindow {
            tabs: window
                .tabs
                .into_iter()
                .enumerate()
                .filter_map(|(tab_idx, tab)| current_entry(tab).map(|entry| (tab_idx, entry)))
                .map(|(tab_idx, entry)| LocalTab {
                    title: entry
                        .title
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| entry.url.clone()),
                    url: entry.url,
                    window_id: window_idx as i64 + 1,
                    index: tab_idx,
                })
                .collect(),
            selected: window.selected,
        })
        .collect();

    Ok(SessionSnapshot { windows })
}

fn current_entry(tab: RawTab) -> Option<RawEntry> {
    let count = tab.entries.len();
    if count == 0 {
        return None;
    }
    let position = tab.index.unwrap_or(count).clamp(1, count) - 1;
    tab.entries.into_iter().nth(position)
}

/// Read, decode and parse a session file into a flat tab list.
pub async fn load_session_tabs(path: impl AsRef<Path>) -> Result<Vec<LocalTab>> {
    let path = path.as_ref();
    let document = frame::decode_file(path).await?;
    let tabs = parse_session(&document)?.into_tabs();
    debug!("Loaded {} tabs from {}", tabs.len(), path.display());
    Ok(tabs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TabkitError;

    const SESSION: &str = r#"{
        "version": ["sessionrestore", 1],
        "windows": [
            {
                "selected": 2,
                "tabs": [
                    {"entries": [{"url": "https://a.example", "title": "A"},
                                 {"url": "https://b.example", "title": "B"}], "index": 1},
                    {"entries": [{"url": "https://c.example", "title": ""}], "index": 1},
                    {"entries": []}
                ]
            },
            {
                "tabs": [
                    {"entries": [{"url": "https://d.example", "title": "D"}], "index": 9}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_session_picks_current_entry() {
        let snapshot = parse_session(SESSION.as_bytes()).unwrap();
        assert_eq!(snapshot.windows.len(), 2);

        let first = &snapshot.windows[0];
        assert_eq!(first.selected, Some(2));
        assert_eq!(first.tabs.len(), 2);
        assert_eq!(first.tabs[0].url, "https://a.example");
        assert_eq!(first.tabs[0].title, "A");
        assert_eq!(first.tabs[1].title, "https://c.example");
        assert_eq!(first.tabs[1].index, 1);

        let second = &snapshot.windows[1];
        assert_eq!(second.tabs[0].url, "https://d.example");
        assert_eq!(second.tabs[0].window_id, 2);
    }

    #[test]
    fn test_into_tabs_flattens_windows() {
        let tabs = parse_session(SESSION.as_bytes()).unwrap().into_tabs();
        let urls: Vec<_> = tabs.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.example", "https://c.example", "https://d.example"]
        );
    }

    #[test]
    fn test_empty_tab_keeps_positions() {
        let document = br#"{"windows": [{"selected": 2, "tabs": [
            {"entries": []},
            {"entries": [{"url": "https://b.example", "title": "B"}], "index": 1},
            {"entries": [{"url": "https://c.example", "title": "C"}], "index": 1}
        ]}]}"#;
        let snapshot = parse_session(document).unwrap();
        let window = &snapshot.windows[0];

        let indices: Vec<_> = window.tabs.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(window.selected_tab().map(|t| t.title.as_str()), Some("B"));
    }

    #[test]
    fn test_selected_tab_without_history() {
        let document = br#"{"windows": [{"selected": 1, "tabs": [
            {"entries": []},
            {"entries": [{"url": "https://b.example", "title": "B"}]}
        ]}]}"#;
        let snapshot = parse_session(document).unwrap();
        assert!(snapshot.windows[0].selected_tab().is_none());
    }

    #[test]
    fn test_missing_windows_is_empty() {
        let snapshot = parse_session(b"{}").unwrap();
        assert!(snapshot.windows.is_empty());
    }

    #[test]
    fn test_non_json_is_json_error() {
        let err = parse_session(b"\x00\x01not json").unwrap_err();
        assert!(matches!(err, TabkitError::Json { .. }));
    }

    #[tokio::test]
    async fn test_load_session_tabs_from_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessionstore.jsonlz4");

        // A single literal-only sequence carrying the whole document.
        let body = SESSION.as_bytes();
        let mut contents = frame::encode_header(body.len() as u32).to_vec();
        contents.push(0xf0);
        let mut remaining = body.len() - 15;
        while remaining >= 255 {
            contents.push(255);
            remaining -= 255;
        }
        contents.push(remaining as u8);
        contents.extend_from_slice(body);
        tokio::fs::write(&path, &contents).await.unwrap();

        let tabs = load_session_tabs(&path).await.unwrap();
        assert_eq!(tabs.len(), 3);
        assert_eq!(tabs[2].title, "D");
    }

    #[tokio::test]
    async fn test_load_session_tabs_missing_file() {
        let err = load_session_tabs("/nonexistent/recovery.jsonlz4")
            .await
            .unwrap_err();
        assert!(matches!(err, TabkitError::FileNotFound(_)));
    }
}
