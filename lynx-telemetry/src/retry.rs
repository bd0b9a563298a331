// Copyright 2025 IoT Open.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Retry policy for startup operations such as the broker connect.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{error, warn};

/// Delay between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles after every failure, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay after the given number of failed attempts (starting at 1).
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(failures.saturating_sub(1));
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries until the operation succeeds.
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    /// Retry forever, five seconds apart.
    fn default() -> Self {
        Self::forever(Backoff::Fixed(Duration::from_secs(5)))
    }
}

impl RetryPolicy {
    pub fn forever(backoff: Backoff) -> Self {
        Self {
            max_attempts: None,
            backoff,
        }
    }

    pub fn bounded(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            backoff,
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent, returning
    /// the last error in the latter case.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        error!("{operation} failed after {attempt} attempt(s): {e}");
                        return Err(e);
                    }
                    let delay = self.backoff.delay(attempt);
                    warn!("{operation} failed (attempt {attempt}): {e}; retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(10),
        };
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(3), Duration::from_secs(4));
        assert_eq!(backoff.delay(5), Duration::from_secs(10));
        assert_eq!(backoff.delay(200), Duration::from_secs(10));
    }

    #[test]
    fn test_default_policy_retries_forever_every_five_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.backoff, Backoff::Fixed(Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success_with_fixed_delay() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<u32, &str> = RetryPolicy::default()
            .run("connect", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err("broker unreachable")
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_policy_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::bounded(3, Backoff::Fixed(Duration::from_millis(10)));

        let result: Result<(), String> = policy
            .run("connect", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(format!("failure {n}")) }
            })
            .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_does_not_sleep() {
        let policy = RetryPolicy::bounded(1, Backoff::Fixed(Duration::from_secs(3600)));
        let result: Result<&str, &str> = policy.run("connect", || async { Ok("up") }).await;
        assert_eq!(result, Ok("up"));
    }
}
