//! Tabkit Core - Headless access layer for browser artifacts.
//!
//! This crate decodes `mozLz40` session-store frames, reads bookmarks,
//! history, workspaces and synced tabs from browser-owned SQLite files that
//! are often locked, merges local and synced tabs by device, and ranks any
//! of those records with a weighted fuzzy search.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabkit_core::{
//!     CancellationToken, NormalizerRegistry, ResilientQueryExecutor, ScriptTabEnumerator,
//!     SourceAggregator, WeightedField, WeightedFuzzyIndex, NormalizationCache,
//! };
//!
//! #[tokio::main]
//! async fn main() -> tabkit_core::Result<()> {
//!     let aggregator = SourceAggregator::new(
//!         Arc::new(ScriptTabEnumerator::for_application("Safari")),
//!         ResilientQueryExecutor::default(),
//!     )
//!     .with_remote_db("/path/to/CloudTabs.db")
//!     .with_current_device_name("My Mac");
//!
//!     let outcome = aggregator.collect(&CancellationToken::new()).await?;
//!     let tabs: Vec<_> = outcome.devices.into_iter().flat_map(|d| d.tabs).collect();
//!
//!     let registry = NormalizerRegistry::with_defaults();
//!     let results = WeightedFuzzyIndex::new(&registry).search(
//!         &tabs,
//!         &WeightedField::defaults(),
//!         "docs",
//!         &mut NormalizationCache::new(),
//!     );
//!     println!("{} matching tabs", results.hits.len());
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod paths;
pub mod search;
pub mod session;
pub mod sources;
pub mod store;

// Re-export commonly used types
pub use cancel::{CancellationToken, CancelledError};
pub use codec::{decode, decode_file, load_session_tabs, parse_session, SessionSnapshot};
pub use config::Preferences;
pub use error::{Result, TabkitError};
pub use models::{Bookmark, Device, HistoryEntry, LocalTab, RemoteTab, TabRecord, Workspace};
pub use search::{
    NormalizationCache, Normalizer, NormalizerRegistry, SearchHit, SearchResults, Searchable,
    WeightedField, WeightedFuzzyIndex,
};
pub use session::{QueryTicket, SearchSession};
pub use sources::{
    aggregate, AggregateOutcome, ScriptTabEnumerator, SessionFileEnumerator, SourceAggregator,
    SourceFailure, SourceKind, TabEnumerator,
};
pub use store::{queries, ReadQuery, ResilientQueryExecutor, RetryPolicy};
