//! Retry scheduling for failed send tasks.
//!
//! The worker owns retries: the broker redelivers nothing on its own, so a
//! failed task is re-published after a backoff chosen here. Attempt counts
//! are process-local; a worker restart forgets them and the reaper
//! re-queues whatever never reached a terminal status, so at worst a
//! record gets a fresh retry budget.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;

/// Backoff schedule for send-task retries.
///
/// Built from the `queue.retry_delay_secs` and `queue.retry_max_delay_secs`
/// settings: the delay doubles per attempt from the base to the cap, which
/// is 30 s to 480 s by default (30, 60, 120, 240, 480). Delays below the
/// cap carry up to 25 % jitter so a burst of failures doesn't come back in
/// lockstep; once the ladder reaches the cap the delay is exactly the cap.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base: Duration,
    cap: Duration,
}

impl RetryPolicy {
    pub fn new(delay_secs: u64, max_delay_secs: u64) -> Self {
        Self {
            base: Duration::from_secs(delay_secs),
            cap: Duration::from_secs(max_delay_secs.max(delay_secs)),
        }
    }

    /// Delay before the given 1-based retry attempt. Attempt 0 is the
    /// initial dispatch and waits nothing.
    pub fn delay(&self, attempt: u8) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let doublings = u32::from(attempt - 1).min(16);
        let scheduled = self.base.saturating_mul(1u32 << doublings);
        if scheduled >= self.cap {
            return self.cap;
        }

        let jitter_ms = rand::rng().random_range(0..=scheduled.as_millis() as u64 / 4);
        (scheduled + Duration::from_millis(jitter_ms)).min(self.cap)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(30, 480)
    }
}

/// What to do with a send task after a failed attempt.
#[derive(Debug, Clone, Copy)]
pub enum RetryDecision {
    /// Re-publish the task after `delay`.
    Retry { attempt: u8, delay: Duration },
    /// The retry budget is spent; leave the record to the reaper horizon.
    GiveUp { attempts: u8 },
}

struct Entry {
    attempts: u8,
    touched: Instant,
}

/// Per-record retry bookkeeping for the worker process.
pub struct RetryLedger {
    entries: HashMap<String, Entry>,
    max_retry: u8,
    policy: RetryPolicy,
}

impl RetryLedger {
    pub fn new(max_retry: u8, policy: RetryPolicy) -> Self {
        Self {
            entries: HashMap::new(),
            max_retry,
            policy,
        }
    }

    /// Count a failed attempt for the record and decide its fate. Giving
    /// up drops the entry, so a later reaper re-queue of the same record
    /// starts with a fresh budget.
    pub fn note_failure(&mut self, log_id: &str) -> RetryDecision {
        let entry = self.entries.entry(log_id.to_string()).or_insert(Entry {
            attempts: 0,
            touched: Instant::now(),
        });
        entry.attempts += 1;
        entry.touched = Instant::now();
        let attempts = entry.attempts;

        if attempts > self.max_retry {
            self.entries.remove(log_id);
            RetryDecision::GiveUp { attempts }
        } else {
            RetryDecision::Retry {
                attempt: attempts,
                delay: self.policy.delay(attempts),
            }
        }
    }

    /// Drop the record's entry (delivered, or failed permanently).
    pub fn forget(&mut self, log_id: &str) {
        self.entries.remove(log_id);
    }

    pub fn attempts(&self, log_id: &str) -> u8 {
        self.entries.get(log_id).map_or(0, |e| e.attempts)
    }

    /// Evict entries untouched for at least `idle_for` and return how many
    /// were dropped. Covers tasks that vanished mid-retry, e.g. a
    /// re-publish that was never redelivered to this process.
    pub fn evict_idle(&mut self, idle_for: Duration) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries
            .retain(|_, entry| now.duration_since(entry.touched) < idle_for);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
