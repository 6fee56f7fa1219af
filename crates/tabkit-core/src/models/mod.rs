//! Data models for tabkit.
//!
//! Tabs and devices come from the live enumerator and the synced-tabs
//! database; bookmarks, history and workspaces come from a profile's
//! places database. All of them serialize to the camelCase JSON the
//! command-line front end prints.

mod places;
mod tab;

pub use places::*;
pub use tab::*;

/// Host of a URL without a leading `www.`, if the URL has one.
pub fn url_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}
