//! Debounce-and-cancel bookkeeping for interactive searches.
//!
//! Every keystroke starts a new query with [`SearchSession::begin`]. That
//! cancels whatever the previous query was still doing (including a retry
//! backoff) and hands out a ticket tagged with a higher generation. A result
//! is only published if its ticket is still the newest one.

use crate::cancel::CancellationToken;
use crate::search::NormalizationCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Identifies one in-flight query.
#[derive(Debug, Clone)]
pub struct QueryTicket {
    generation: u64,
    token: CancellationToken,
}

impl QueryTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token to pass to the executor and aggregator for this query.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// State shared by the queries of one search session.
#[derive(Debug, Default)]
pub struct SearchSession {
    generation: AtomicU64,
    current: Mutex<Option<CancellationToken>>,
    cache: Mutex<NormalizationCache>,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new query, cancelling the previous one.
    pub fn begin(&self) -> QueryTicket {
        // The generation bump and the token swap happen under one lock so
        // the newest generation always owns the installed token.
        let mut current = lock(&self.current);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        drop(current);
        debug!("Search generation {} started", generation);
        QueryTicket { generation, token }
    }

    /// Whether no newer query has started since `ticket` was issued.
    pub fn is_current(&self, ticket: &QueryTicket) -> bool {
        !ticket.token.is_cancelled()
            && ticket.generation == self.generation.load(Ordering::SeqCst)
    }

    /// Pass `value` through if `ticket` is still current, drop it otherwise.
    pub fn publish<T>(&self, ticket: &QueryTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!(
                "Discarding result of superseded search generation {}",
                ticket.generation
            );
            None
        }
    }

    /// Normalized strings cached for this session.
    pub fn cache(&self) -> MutexGuard<'_, NormalizationCache> {
        lock(&self.cache)
    }

    /// Cancel the in-flight query and drop the cache.
    pub fn end(&self) {
        if let Some(token) = lock(&self.current).take() {
            token.cancel();
        }
        lock(&self.cache).clear();
        debug!("Search session ended");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
