// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bounded retry of remote calls.

use graph::GraphError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;
use vrouter::RegistrationError;

/// Errors which may go away when the failed call is repeated.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for GraphError {
    fn is_transient(&self) -> bool {
        GraphError::is_transient(self)
    }
}

impl Transient for RegistrationError {
    fn is_transient(&self) -> bool {
        RegistrationError::is_transient(self)
    }
}

/// How often, and how patiently, a transiently failing call is repeated.
///
/// The n-th retry waits `initial_backoff * 2^n`, at most `max_backoff`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_retries(Self::DEFAULT_RETRIES)
    }
}

impl RetryPolicy {
    pub const DEFAULT_RETRIES: u32 = 3;
    pub const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
    pub const MAX_BACKOFF: Duration = Duration::from_secs(5);

    /// Give up at the first failure.
    pub const NEVER: RetryPolicy = RetryPolicy {
        retries: 0,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    };

    #[must_use]
    pub const fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            initial_backoff: Self::INITIAL_BACKOFF,
            max_backoff: Self::MAX_BACKOFF,
        }
    }

    /// The delay before retry number `retry` (counting from 0).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `call` until it succeeds, fails permanently or the retries are used up.
    ///
    /// # Errors
    ///
    /// Returns the last error of `call`.
    pub async fn run<T, E, F, Fut>(&self, what: impl Display, mut call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        let mut retry = 0;
        loop {
            match call().await {
                Err(e) if e.is_transient() && retry < self.retries => {
                    let delay = self.backoff(retry);
                    warn!("{what} failed: {e}; retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use graph::GraphError;
    use std::cell::Cell;
    use std::time::Duration;

    fn immediate(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            ..RetryPolicy::NEVER
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(200));
        assert_eq!(policy.backoff(1), Duration::from_millis(400));
        assert_eq!(policy.backoff(2), Duration::from_millis(800));
        assert_eq!(policy.backoff(10), RetryPolicy::MAX_BACKOFF);
        assert_eq!(policy.backoff(40), RetryPolicy::MAX_BACKOFF);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let calls = Cell::new(0);
        let outcome = immediate(3)
            .run("test call", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(GraphError::Timeout)
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(outcome, Ok(3));
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = Cell::new(0);
        let outcome: Result<(), _> = immediate(3)
            .run("test call", || {
                calls.set(calls.get() + 1);
                async {
                    Err(GraphError::Rejected {
                        status: 400,
                        message: String::new(),
                    })
                }
            })
            .await;
        assert!(outcome.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = Cell::new(0);
        let outcome: Result<(), _> = immediate(2)
            .run("test call", || {
                calls.set(calls.get() + 1);
                async { Err(GraphError::Unavailable(503)) }
            })
            .await;
        assert_eq!(outcome, Err(GraphError::Unavailable(503)));
        assert_eq!(calls.get(), 3);
    }
}
