//! Poll-until-predicate with a fixed attempt budget.
//!
//! The backend control plane applies some configuration asynchronously, so a
//! mutation is followed by repeated reads until a status field settles. The
//! loop here is the one reusable piece of that: a poll function, a success
//! predicate, a fixed delay between polls, and an optional cancellation
//! token. Without a token the attempt budget is the only bound.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default number of polls before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Default delay between polls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Attempt budget and fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Maximum number of polls
    pub max_attempts: u32,
    /// Delay between consecutive polls
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl PollPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Total time spent sleeping when every attempt is used.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.interval
            .saturating_mul(self.max_attempts.saturating_sub(1))
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T, E> {
    /// The predicate accepted a polled value.
    Succeeded {
        /// Accepted value
        value: T,
        /// Polls issued
        attempts: u32,
    },
    /// The poll function returned an error.
    Failed {
        /// Poll error
        error: E,
        /// Polls issued, including the failing one
        attempts: u32,
    },
    /// The budget ran out.
    TimedOut {
        /// Last rejected value
        last: Option<T>,
        /// Polls issued
        attempts: u32,
    },
    /// The cancellation token fired.
    Cancelled {
        /// Last rejected value
        last: Option<T>,
        /// Polls issued
        attempts: u32,
    },
}

impl<T, E> PollOutcome<T, E> {
    /// Polls issued before the loop ended.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::TimedOut { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Returns true for [`PollOutcome::Succeeded`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Short outcome label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl<T, E> fmt::Display for PollOutcome<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Polls until `done` accepts a value, the poll fails, the budget runs out,
/// or `cancel` fires.
///
/// `poll` receives the 1-based attempt number. Exactly one `interval` elapses
/// between consecutive polls and none after the last one. An error from
/// `poll` ends the loop immediately; it is not retried.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: &PollPolicy,
    cancel: Option<&CancellationToken>,
    mut poll: F,
    mut done: P,
) -> PollOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
    E: fmt::Display,
{
    let mut last = None;

    for attempt in 1..=policy.max_attempts {
        let issued = attempt - 1;
        if attempt > 1 {
            if let Some(token) = cancel {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!(attempts = issued, "Polling cancelled while waiting");
                        return PollOutcome::Cancelled { last, attempts: issued };
                    }
                    () = tokio::time::sleep(policy.interval) => {}
                }
            } else {
                tokio::time::sleep(policy.interval).await;
            }
        } else if cancel.is_some_and(CancellationToken::is_cancelled) {
            return PollOutcome::Cancelled {
                last,
                attempts: issued,
            };
        }

        match poll(attempt).await {
            Ok(value) if done(&value) => {
                if attempt > 1 {
                    debug!(attempts = attempt, "Polling succeeded after retry");
                }
                return PollOutcome::Succeeded {
                    value,
                    attempts: attempt,
                };
            }
            Ok(value) => {
                debug!(
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    retry_in_ms = policy.interval.as_millis(),
                    "Poll result not terminal, waiting"
                );
                last = Some(value);
            }
            Err(error) => {
                warn!(attempt = attempt, error = %error, "Poll failed");
                return PollOutcome::Failed {
                    error,
                    attempts: attempt,
                };
            }
        }
    }

    warn!(
        attempts = policy.max_attempts,
        "Polling budget exhausted without success"
    );
    PollOutcome::TimedOut {
        last,
        attempts: policy.max_attempts,
    }
}
