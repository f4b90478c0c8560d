//! Fixed-delay retry for progress API calls

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::api::ApiError;
use crate::config::RetryConfig;

/// Total attempts per operation, including the first
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Constant pause between attempts
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Retry policy: a bounded number of attempts with a constant delay
///
/// There is no exponential backoff; every gap between attempts is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_DELAY)
    }
}

impl RetryPolicy {
    /// Create a policy; at least one attempt is always made
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        debug!(?config, "from_config: called");
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// The last error is returned once the budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        debug!(%operation, max_attempts = self.max_attempts, "run: called");
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    debug!(%operation, attempt, "run: success");
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        %operation,
                        attempt,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %e,
                        "run: retrying after transient error"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(%operation, attempt, error = %e, "run: giving up");
                    return Err(e);
                }
            }
        }
    }
}
