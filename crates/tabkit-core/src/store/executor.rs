//! Read-only query execution against browser-owned SQLite files.
//!
//! The browser keeps its databases open while running, so reads regularly
//! hit `SQLITE_BUSY` or catch a file mid-write. The executor opens the file
//! read-only with no busy timeout and lets [`run_with_retry`] decide what to
//! do with each failure.

use super::retry::{run_with_retry, ErrorClass, RetryPolicy, RetryStats};
use crate::cancel::CancellationToken;
use crate::error::{Result, TabkitError};
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, OpenFlags, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// A parameterized read query plus the function turning rows into `T`.
#[derive(Debug, Clone)]
pub struct ReadQuery<T> {
    sql: &'static str,
    params: Vec<Value>,
    map_row: fn(&Row<'_>) -> rusqlite::Result<T>,
}

impl<T> ReadQuery<T> {
    pub fn new(sql: &'static str, map_row: fn(&Row<'_>) -> rusqlite::Result<T>) -> Self {
        Self {
            sql,
            params: Vec::new(),
            map_row,
        }
    }

    /// Append a positional parameter (`?1`, `?2`, ... in binding order).
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &'static str {
        self.sql
    }
}

/// Runs [`ReadQuery`]s with retry on lock contention.
#[derive(Debug, Clone, Default)]
pub struct ResilientQueryExecutor {
    policy: RetryPolicy,
}

impl ResilientQueryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `query` against the database at `db_path`.
    pub async fn execute<T>(
        &self,
        db_path: &Path,
        query: &ReadQuery<T>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
    {
        self.execute_with_stats(db_path, query, cancel).await.0
    }

    /// Like [`execute`](Self::execute), also returning the retry report.
    pub async fn execute_with_stats<T>(
        &self,
        db_path: &Path,
        query: &ReadQuery<T>,
        cancel: &CancellationToken,
    ) -> (Result<Vec<T>>, RetryStats)
    where
        T: Send + 'static,
    {
        debug!("Executing query against {}", db_path.display());
        run_with_retry(&self.policy, cancel, |attempt| {
            let path = db_path.to_path_buf();
            let sql = query.sql;
            let params = query.params.clone();
            let map_row = query.map_row;
            let policy = self.policy.clone();
            async move {
                debug!("Query attempt {} on {}", attempt, path.display());
                tokio::task::spawn_blocking(move || {
                    run_once(&path, sql, params, map_row)
                        .map_err(|e| classify_error(e, &path, &policy))
                })
                .await
                .map_err(|e| TabkitError::Other(format!("Query task failed: {}", e)))?
            }
        })
        .await
    }
}

/// Failure of a single attempt, before classification.
enum AttemptError {
    Io(std::io::Error),
    Sqlite(rusqlite::Error),
    WritingStatement,
}

impl From<rusqlite::Error> for AttemptError {
    fn from(err: rusqlite::Error) -> Self {
        AttemptError::Sqlite(err)
    }
}

fn run_once<T>(
    path: &Path,
    sql: &str,
    params: Vec<Value>,
    map_row: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> std::result::Result<Vec<T>, AttemptError> {
    // Surface missing files and permission problems as io errors before
    // SQLite turns them into a generic "unable to open database file".
    std::fs::File::open(path).map_err(AttemptError::Io)?;

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(Duration::ZERO)?;

    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(AttemptError::WritingStatement);
    }
    let rows = stmt.query_map(rusqlite::params_from_iter(params), map_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn classify_error(err: AttemptError, path: &Path, policy: &RetryPolicy) -> TabkitError {
    match err {
        AttemptError::Io(e) => TabkitError::io_with_path(e, path),
        AttemptError::WritingStatement => TabkitError::Database {
            message: "refusing to run a statement that writes".into(),
            source: None,
        },
        AttemptError::Sqlite(e) => {
            let class = match &e {
                rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                    ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::DatabaseCorrupt => ErrorClass::Transient,
                    ErrorCode::PermissionDenied | ErrorCode::AuthorizationForStatementDenied => {
                        ErrorClass::Permission
                    }
                    _ => policy.classify_message(&e.to_string()),
                },
                _ => policy.classify_message(&e.to_string()),
            };
            match class {
                ErrorClass::Transient => TabkitError::Transient {
                    message: e.to_string(),
                },
                ErrorClass::Permission => permission_denied(path, &e.to_string()),
                _ => TabkitError::Database {
                    message: e.to_string(),
                    source: Some(e),
                },
            }
        }
    }
}

fn permission_denied(path: &Path, detail: &str) -> TabkitError {
    TabkitError::PermissionDenied {
        path: PathBuf::from(path),
        message: format!(
            "{}. Grant this application access to the browser's data (Full Disk Access on macOS)",
            detail
        ),
    }
}
