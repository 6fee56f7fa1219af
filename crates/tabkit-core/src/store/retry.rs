//! Retry state machine for reads against databases the browser may hold
//! locked.
//!
//! Each run moves through explicit states:
//!
//! ```text
//! Idle -> Executing -> Success
//!                   -> Classifying -> Idle (retry after base_delay * attempt)
//!                                  -> Failed
//! any waiting state -> Abandoned (cancelled)
//! ```
//!
//! Cancellation is a transition of its own: it interrupts a pending backoff
//! and no further attempt is scheduled.

use crate::cancel::CancellationToken;
use crate::config::RetryDefaults;
use crate::error::{Result, TabkitError};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How a failed attempt is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// The attempt succeeded.
    None,
    /// Lock contention or a mid-write read; worth retrying.
    Transient,
    /// Access denied; the user has to act first.
    Permission,
    /// Retrying will not help.
    Permanent,
}

/// Retry configuration: attempt budget, linear backoff and the message
/// classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RetryDefaults::MAX_ATTEMPTS,
            base_delay: RetryDefaults::BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default attempt budget and delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts (including the first one).
    ///
    /// Values below 1 are raised to 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Get the maximum number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Get the base delay.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay after the given 1-based attempt fails: `base_delay * attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Classify an error message.
    pub fn classify_message(&self, message: &str) -> ErrorClass {
        let message = message.to_lowercase();
        if message.contains("locked")
            || message.contains("busy")
            || message.contains("malformed")
        {
            ErrorClass::Transient
        } else if message.contains("permission denied")
            || message.contains("not permitted")
            || message.contains("not authorized")
            || message.contains("authorization denied")
        {
            ErrorClass::Permission
        } else {
            ErrorClass::Permanent
        }
    }

    /// Classify an error already mapped into the library's error type.
    pub fn classify(&self, err: &TabkitError) -> ErrorClass {
        match err {
            TabkitError::Transient { .. } => ErrorClass::Transient,
            TabkitError::PermissionDenied { .. } => ErrorClass::Permission,
            _ => ErrorClass::Permanent,
        }
    }
}

/// One execution of the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAttempt {
    /// 1-based attempt number.
    pub index: u32,
    pub error: Option<String>,
    pub class: ErrorClass,
}

/// States of a retried query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum QueryState {
    Idle,
    Executing { attempt: u32 },
    Classifying { attempt: u32 },
    Success,
    Failed,
    Abandoned,
}

/// What happened during a retried run.
#[derive(Debug, Clone, Serialize)]
pub struct RetryStats {
    pub attempts: Vec<QueryAttempt>,
    /// Every state visited, in order, ending with the terminal one.
    pub states: Vec<QueryState>,
    pub total_delay: Duration,
}

impl RetryStats {
    fn new() -> Self {
        Self {
            attempts: Vec::new(),
            states: vec![QueryState::Idle],
            total_delay: Duration::ZERO,
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn final_state(&self) -> QueryState {
        self.states.last().copied().unwrap_or(QueryState::Idle)
    }

    fn enter(&mut self, state: QueryState) -> QueryState {
        self.states.push(state);
        state
    }
}

/// Run `operation` under `policy` until it succeeds, fails for good, runs
/// out of attempts or `cancel` fires.
///
/// `operation` receives the 1-based attempt number.
pub async fn run_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> (Result<T>, RetryStats)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut stats = RetryStats::new();
    let mut state = QueryState::Idle;
    let mut pending_delay: Option<Duration> = None;
    let mut attempt = 0;
    let mut last_error: Option<TabkitError> = None;

    loop {
        state = match state {
            QueryState::Idle => {
                if cancel.is_cancelled() {
                    stats.enter(QueryState::Abandoned)
                } else if let Some(delay) = pending_delay.take() {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => stats.enter(QueryState::Abandoned),
                        _ = tokio::time::sleep(delay) => {
                            attempt += 1;
                            stats.enter(QueryState::Executing { attempt })
                        }
                    }
                } else {
                    attempt += 1;
                    stats.enter(QueryState::Executing { attempt })
                }
            }

            QueryState::Executing { attempt } => {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = operation(attempt) => Some(result),
                };
                match outcome {
                    None => stats.enter(QueryState::Abandoned),
                    Some(Ok(value)) => {
                        stats.attempts.push(QueryAttempt {
                            index: attempt,
                            error: None,
                            class: ErrorClass::None,
                        });
                        stats.enter(QueryState::Success);
                        if attempt > 1 {
                            debug!("Query succeeded after {} attempts", attempt);
                        }
                        return (Ok(value), stats);
                    }
                    Some(Err(TabkitError::Cancelled)) => stats.enter(QueryState::Abandoned),
                    Some(Err(err)) => {
                        last_error = Some(err);
                        stats.enter(QueryState::Classifying { attempt })
                    }
                }
            }

            QueryState::Classifying { attempt } => {
                let Some(err) = last_error.take() else {
                    return (
                        Err(TabkitError::Other(
                            "retry loop classified an attempt without an error".into(),
                        )),
                        stats,
                    );
                };
                let class = policy.classify(&err);
                stats.attempts.push(QueryAttempt {
                    index: attempt,
                    error: Some(err.to_string()),
                    class,
                });

                match class {
                    ErrorClass::Transient if attempt < policy.max_attempts() => {
                        let delay = policy.delay_for(attempt);
                        stats.total_delay += delay;
                        warn!(
                            "Attempt {}/{} failed: {}. Retrying in {:?}",
                            attempt,
                            policy.max_attempts(),
                            err,
                            delay
                        );
                        pending_delay = Some(delay);
                        stats.enter(QueryState::Idle)
                    }
                    ErrorClass::Transient => {
                        warn!(
                            "All {} attempts exhausted. Last error: {}",
                            policy.max_attempts(),
                            err
                        );
                        last_error = Some(TabkitError::ExhaustedRetries {
                            attempts: attempt,
                            last_error: err.to_string(),
                        });
                        stats.enter(QueryState::Failed)
                    }
                    _ => {
                        debug!("Error is not retryable: {}", err);
                        last_error = Some(err);
                        stats.enter(QueryState::Failed)
                    }
                }
            }

            QueryState::Failed => {
                let err = last_error
                    .take()
                    .unwrap_or_else(|| TabkitError::Other("query failed".into()));
                return (Err(err), stats);
            }

            QueryState::Abandoned => {
                debug!("Query abandoned after {} attempts", stats.attempt_count());
                return (Err(TabkitError::Cancelled), stats);
            }

            QueryState::Success => {
                return (
                    Err(TabkitError::Other(
                        "retry loop reached success without a value".into(),
                    )),
                    stats,
                );
            }
        };
    }
}
