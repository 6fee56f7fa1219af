//! Read-only access to browser databases.
//!
//! This module provides:
//! - A retry state machine for lock contention (`retry`)
//! - A read-only SQLite executor built on it (`executor`)
//! - Typed queries for bookmarks, history, synced tabs and workspaces (`queries`)

mod executor;
pub mod queries;
mod retry;

pub use executor::{ReadQuery, ResilientQueryExecutor};
pub use retry::{run_with_retry, ErrorClass, QueryAttempt, QueryState, RetryPolicy, RetryStats};
