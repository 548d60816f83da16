//! Bounded polling for records that materialize after a write
//!
//! The completion tracker's write path can lag the record store's read path
//! (cache propagation, replication). Callers poll a fixed number of times
//! with a fixed wait instead of assuming read-after-write consistency.

use acu_common::config::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS};
use acu_common::Result;
use std::time::{Duration, Instant};

/// Attempt count and inter-attempt wait for [`poll_until_found`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total lookups, including the first
    pub attempts: u32,
    /// Wait between lookups (never after the last)
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Same attempt budget with no waiting, for tests
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }

    /// Worst-case time spent waiting
    pub fn total_wait(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }
}

impl Default for PollPolicy {
    /// 10 attempts, 50ms apart
    fn default() -> Self {
        Self::new(
            DEFAULT_POLL_ATTEMPTS,
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }
}

/// Call `operation` until it yields `Some`, up to `policy.attempts` times.
///
/// **Algorithm:**
/// 1. Attempt lookup
/// 2. `Ok(Some)` → return it
/// 3. `Ok(None)` → if attempts remain, sleep `policy.interval` and retry;
///    otherwise return `Ok(None)`
/// 4. `Err` → return immediately (no retry)
///
/// A policy with zero attempts still performs one lookup.
pub async fn poll_until_found<F, Fut, T>(
    operation_name: &str,
    policy: PollPolicy,
    mut operation: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>>>,
{
    let start_time = Instant::now();
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        if attempt > 1 {
            tracing::debug!(
                operation = operation_name,
                attempt,
                "Polling again"
            );
        }

        if let Some(found) = operation().await? {
            if attempt > 1 {
                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Record materialized after polling"
                );
            }
            return Ok(Some(found));
        }

        if attempt < attempts && !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
    }

    tracing::warn!(
        operation = operation_name,
        attempts,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Record did not materialize within poll budget"
    );

    Ok(None)
}
