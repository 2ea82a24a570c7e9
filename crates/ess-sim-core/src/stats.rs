//! ---
//! ess_section: "01-core-functionality"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Simulator runtime core."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Runtime counters shared between triggers and observers.
#[derive(Debug, Default)]
pub struct RuntimeStats {
    updates: AtomicU64,
    send_attempts: AtomicU64,
    send_successes: AtomicU64,
    send_failures: AtomicU64,
    reconnects_scheduled: AtomicU64,
    last_update: Mutex<Option<DateTime<Utc>>>,
    last_send_success: Mutex<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`RuntimeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub updates: u64,
    pub send_attempts: u64,
    pub send_successes: u64,
    pub send_failures: u64,
    pub reconnects_scheduled: u64,
    pub last_update: Option<DateTime<Utc>>,
    pub last_send_success: Option<DateTime<Utc>>,
}

impl RuntimeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
        *self.last_update.lock() = Some(Utc::now());
    }

    pub fn record_attempt(&self) {
        self.send_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.send_successes.fetch_add(1, Ordering::Relaxed);
        *self.last_send_success.lock() = Some(Utc::now());
    }

    pub fn record_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero the update counter, as done on a data reset.
    pub fn reset_updates(&self) {
        self.updates.store(0, Ordering::Relaxed);
        *self.last_update.lock() = None;
    }

    /// Zero attempt, success and failure counters.
    pub fn reset_send_statistics(&self) {
        self.send_attempts.store(0, Ordering::Relaxed);
        self.send_successes.store(0, Ordering::Relaxed);
        self.send_failures.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            updates: self.updates.load(Ordering::Relaxed),
            send_attempts: self.send_attempts.load(Ordering::Relaxed),
            send_successes: self.send_successes.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
            last_update: *self.last_update.lock(),
            last_send_success: *self.last_send_success.lock(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_reset_keeps_update_count() {
        let stats = RuntimeStats::new();
        stats.record_update();
        stats.record_attempt();
        stats.record_success();
        stats.record_attempt();
        stats.record_failure();
        stats.reset_send_statistics();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.updates, 1);
        assert!(snapshot.last_update.is_some());
        assert_eq!(
            (snapshot.send_attempts, snapshot.send_successes, snapshot.send_failures),
            (0, 0, 0)
        );
    }

    #[test]
    fn update_reset_clears_timestamp() {
        let stats = RuntimeStats::new();
        stats.record_update();
        stats.reset_updates();
        assert_eq!(stats.snapshot().updates, 0);
        assert!(stats.snapshot().last_update.is_none());
    }
}
