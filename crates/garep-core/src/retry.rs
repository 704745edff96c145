//! Exponential backoff for transient API failures.
//!
//! [`retry`] re-invokes an async operation while it fails with an error that
//! [`Error::is_recoverable`] accepts, sleeping `base_delay * 2^i` before the
//! `i`-th retry. Once the retry budget is spent the last error is wrapped in
//! [`Error::RetryLimit`].
//!
//! ```rust,no_run
//! use garep_core::{RetryPolicy, retry};
//!
//! # async fn example() -> garep_core::Result<()> {
//! let policy = RetryPolicy::new(3, 2);
//! let body = retry(&policy, || async { Ok::<_, garep_core::Error>("ok") }).await?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error};

/// Retries after the first failure when nothing else is configured.
pub const DEFAULT_RETRIES: u32 = 12;
/// Seconds before the first retry when nothing else is configured.
pub const DEFAULT_DELAY_SECS: u64 = 10;

const MAX_RETRIES: u32 = 15;
const FALLBACK_RETRIES: u32 = 8;
const MIN_DELAY_SECS: u64 = 1;
const MAX_DELAY_SECS: u64 = 30;
const FALLBACK_DELAY_SECS: u64 = 10;

/// How many times and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy from a retry count and an initial delay in seconds.
    ///
    /// Out-of-range values fall back rather than saturate: more than 15
    /// retries becomes 8, and a delay outside `1..=30` seconds becomes 10.
    #[must_use]
    pub const fn new(max_retries: u32, base_delay_secs: u64) -> Self {
        let max_retries = if max_retries > MAX_RETRIES {
            FALLBACK_RETRIES
        } else {
            max_retries
        };
        let delay_secs = if base_delay_secs < MIN_DELAY_SECS || base_delay_secs > MAX_DELAY_SECS {
            FALLBACK_DELAY_SECS
        } else {
            base_delay_secs
        };

        Self {
            max_retries,
            base_delay: Duration::from_secs(delay_secs),
        }
    }

    /// A policy that makes exactly one call.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0, MIN_DELAY_SECS)
    }

    /// Retries allowed after the first call.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the first retry.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay before retry number `retry` (zero based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, DEFAULT_DELAY_SECS)
    }
}

impl From<crate::config::RetryConfig> for RetryPolicy {
    fn from(config: crate::config::RetryConfig) -> Self {
        Self::new(config.attempts, config.delay_secs)
    }
}

/// Run `op` until it succeeds, fails permanently, or exhausts `policy`.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries_done = 0;

    loop {
        match op().await {
            Ok(value) => {
                if retries_done > 0 {
                    debug!("Request succeeded after {retries_done} retries");
                }
                return Ok(value);
            },
            Err(err) if err.is_recoverable() => {
                error!(
                    "Connection to server failed: {err}. Attempts left: {}",
                    policy.max_retries - retries_done
                );
                if retries_done >= policy.max_retries {
                    return Err(Error::RetryLimit {
                        attempts: retries_done + 1,
                        last: Box::new(err),
                    });
                }
                tokio::time::sleep(policy.delay_for(retries_done)).await;
                retries_done += 1;
            },
            Err(err) => return Err(err),
        }
    }
}
