//! Sweep configuration.

use crate::quota::QuotaConfig;
use std::time::Duration;

/// Knobs for a sweep: pool size, per-call deadline, round limit, and the
/// quota thresholds handed to the tracker.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Maximum calls in flight at once.
    pub max_inflight: usize,
    /// Deadline for a single completion call, pause excluded.
    pub call_timeout: Duration,
    /// How many dispatch rounds an item gets before it is abandoned.
    pub max_rounds: u32,
    /// Thresholds and seed budget for the quota tracker.
    pub quota: QuotaConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            max_inflight: 50,
            call_timeout: Duration::from_secs(120),
            max_rounds: 3,
            quota: QuotaConfig::default(),
        }
    }
}

impl SweepConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_inflight(mut self, n: usize) -> Self {
        self.max_inflight = n.max(1);
        self
    }
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }
    pub fn with_quota(mut self, quota: QuotaConfig) -> Self {
        self.quota = quota;
        self
    }

    /// Applies `SWEEP_MAX_INFLIGHT`, `SWEEP_CALL_TIMEOUT_SECS` and
    /// `SWEEP_MAX_ROUNDS` on top of the configured values.
    pub fn overridden_from_env(mut self) -> Self {
        if let Some(n) = env_usize("SWEEP_MAX_INFLIGHT") {
            self.max_inflight = n;
        }
        if let Some(secs) = env_usize("SWEEP_CALL_TIMEOUT_SECS") {
            self.call_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(rounds) = env_usize("SWEEP_MAX_ROUNDS") {
            self.max_rounds = rounds as u32;
        }
        self
    }
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
}
