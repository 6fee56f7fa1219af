//! Typed read queries for the browser databases tabkit consumes.
//!
//! - places database: bookmarks, history visits, workspaces
//! - synced-tabs database: tabs open on other devices

use super::executor::ReadQuery;
use crate::config::QueryDefaults;
use crate::models::{from_prtime, Bookmark, HistoryEntry, RemoteTab, Workspace};
use rusqlite::Row;

const BOOKMARKS_SQL: &str = "
    SELECT b.id, p.url, b.title, b.lastModified, f.title
    FROM moz_bookmarks b
    JOIN moz_places p ON p.id = b.fk
    LEFT JOIN moz_bookmarks f ON f.id = b.parent
    WHERE b.type = 1 AND (?1 = '' OR f.title LIKE ?1 ESCAPE '\\')
    ORDER BY b.lastModified DESC
    LIMIT ?2";

const HISTORY_SQL: &str = "
    SELECT p.url, p.title, v.visit_date
    FROM moz_historyvisits v
    JOIN moz_places p ON p.id = v.place_id
    WHERE ?1 = '' OR p.url LIKE ?1 ESCAPE '\\' OR p.title LIKE ?1 ESCAPE '\\'
    ORDER BY v.visit_date DESC
    LIMIT ?2";

const REMOTE_TABS_SQL: &str = "
    SELECT t.tab_uuid, t.device_uuid, d.device_name, t.title, t.url
    FROM cloud_tabs t
    INNER JOIN cloud_tab_devices d ON d.device_uuid = t.device_uuid
    ORDER BY d.device_name";

const WORKSPACES_SQL: &str = "
    SELECT uuid, name, icon, position, is_default
    FROM zen_workspaces
    ORDER BY position";

/// Most recently modified bookmarks, optionally only those whose folder
/// name contains `folder`.
pub fn bookmarks(folder: &str, limit: Option<u32>) -> ReadQuery<Bookmark> {
    ReadQuery::new(BOOKMARKS_SQL, map_bookmark)
        .bind(contains_pattern(folder))
        .bind(i64::from(limit.unwrap_or(QueryDefaults::BOOKMARK_LIMIT)))
}

/// Most recent visits, optionally filtered by a substring of url or title.
pub fn history(filter: &str, limit: Option<u32>) -> ReadQuery<HistoryEntry> {
    ReadQuery::new(HISTORY_SQL, map_history)
        .bind(contains_pattern(filter))
        .bind(i64::from(limit.unwrap_or(QueryDefaults::HISTORY_LIMIT)))
}

/// Tabs open on synced devices.
pub fn remote_tabs() -> ReadQuery<RemoteTab> {
    ReadQuery::new(REMOTE_TABS_SQL, map_remote_tab)
}

/// Workspaces in display order.
pub fn workspaces() -> ReadQuery<Workspace> {
    ReadQuery::new(WORKSPACES_SQL, map_workspace)
}

/// `LIKE` pattern matching `term` anywhere, or `''` (no filter) when blank.
fn contains_pattern(term: &str) -> String {
    let term = term.trim();
    if term.is_empty() {
        String::new()
    } else {
        format!("%{}%", escape_like(term))
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Text column that may be NULL or not valid UTF-8.
fn lossy_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    use rusqlite::types::ValueRef;
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
    })
}

fn title_or_url(title: Option<String>, url: &str) -> String {
    title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| url.to_string())
}

fn map_bookmark(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
    let url = lossy_text(row, 1)?.unwrap_or_default();
    Ok(Bookmark {
        id: row.get(0)?,
        title: title_or_url(lossy_text(row, 2)?, &url),
        url,
        last_modified: row.get::<_, Option<i64>>(3)?.and_then(from_prtime),
        folder: lossy_text(row, 4)?.filter(|f| !f.is_empty()),
    })
}

fn map_history(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let url = lossy_text(row, 0)?.unwrap_or_default();
    Ok(HistoryEntry {
        title: title_or_url(lossy_text(row, 1)?, &url),
        url,
        visited_at: row.get::<_, Option<i64>>(2)?.and_then(from_prtime),
    })
}

fn map_remote_tab(row: &Row<'_>) -> rusqlite::Result<RemoteTab> {
    let url = lossy_text(row, 4)?.unwrap_or_default();
    Ok(RemoteTab {
        device_id: lossy_text(row, 1)?.unwrap_or_default(),
        device_name: lossy_text(row, 2)?.unwrap_or_default(),
        title: title_or_url(lossy_text(row, 3)?, &url),
        url,
    })
}

fn map_workspace(row: &Row<'_>) -> rusqlite::Result<Workspace> {
    Ok(Workspace {
        uuid: lossy_text(row, 0)?.unwrap_or_default(),
        name: lossy_text(row, 1)?.unwrap_or_default(),
        icon: lossy_text(row, 2)?.filter(|i| !i.is_empty()),
        position: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
        is_default: row.get::<_, Option<i64>>(4)?.unwrap_or_default() != 0,
    })
}
