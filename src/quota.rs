//! 配额跟踪模块：维护服务端报告的剩余配额、冷却时间与节流判定。
//!
//! Quota tracking: the mutex-guarded view of the provider's remaining budget,
//! the thresholds below which dispatch pauses, and reset-hint parsing.

use crate::{Error, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Configuration for the quota tracker: the optimistic budget assumed before
/// the first response arrives, and the thresholds below which dispatch pauses.
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    /// Remaining requests assumed at startup.
    pub initial_requests: u64,
    /// Remaining tokens assumed at startup.
    pub initial_tokens: u64,
    /// Pause before calling once remaining requests drop below this.
    pub min_requests: u64,
    /// Pause before calling once remaining tokens drop below this.
    pub min_tokens: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            initial_requests: 5000,
            initial_tokens: 60_000,
            min_requests: 5,
            min_tokens: 6000,
        }
    }
}

impl QuotaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_requests(mut self, n: u64) -> Self {
        self.min_requests = n;
        self
    }

    pub fn with_min_tokens(mut self, n: u64) -> Self {
        self.min_tokens = n;
        self
    }

    pub fn with_initial_budget(mut self, requests: u64, tokens: u64) -> Self {
        self.initial_requests = requests;
        self.initial_tokens = tokens;
        self
    }
}

/// Rate-limit metadata captured from one successful response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaHints {
    pub remaining_requests: Option<u64>,
    pub remaining_tokens: Option<u64>,
    pub reset_requests: Option<String>,
    pub reset_tokens: Option<String>,
}

impl QuotaHints {
    /// Fully-populated hints, as a well-behaved provider sends them.
    pub fn new(
        remaining_requests: u64,
        remaining_tokens: u64,
        reset_requests: impl Into<String>,
        reset_tokens: impl Into<String>,
    ) -> Self {
        Self {
            remaining_requests: Some(remaining_requests),
            remaining_tokens: Some(remaining_tokens),
            reset_requests: Some(reset_requests.into()),
            reset_tokens: Some(reset_tokens.into()),
        }
    }
}

/// Point-in-time copy of the tracked state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub remaining_requests: u64,
    pub remaining_tokens: u64,
    pub cooldown: Duration,
}

#[derive(Debug)]
struct State {
    remaining_requests: u64,
    remaining_tokens: u64,
    cooldown: Duration,
}

/// Mutex-guarded view of the provider's quota, shared by every call a
/// dispatcher makes. One tracker lives exactly as long as its dispatcher.
///
/// The cooldown consulted by [`QuotaTracker::throttle_hint`] is always the one
/// stored by the previous completed response; the first calls of a run see the
/// initial zero cooldown.
pub struct QuotaTracker {
    cfg: QuotaConfig,
    state: Mutex<State>,
}

impl QuotaTracker {
    pub fn new(cfg: QuotaConfig) -> Self {
        let state = Mutex::new(State {
            remaining_requests: cfg.initial_requests,
            remaining_tokens: cfg.initial_tokens,
            cooldown: Duration::ZERO,
        });
        Self { cfg, state }
    }

    /// Returns the pause to take before the next call, if the last observed
    /// budget is near exhaustion.
    pub async fn throttle_hint(&self) -> Option<Duration> {
        let st = self.state.lock().await;
        if st.remaining_requests < self.cfg.min_requests
            || st.remaining_tokens < self.cfg.min_tokens
        {
            Some(st.cooldown)
        } else {
            None
        }
    }

    /// Overwrite the tracked budget with what the provider just reported.
    ///
    /// All four hints are required; a response without them is treated as
    /// unparseable and the call fails retryably without touching state. An
    /// unrecognized reset unit is a configuration error and fatal.
    pub async fn absorb(&self, hints: &QuotaHints) -> Result<()> {
        let remaining_requests = hints
            .remaining_requests
            .ok_or_else(|| Error::parse("response missing remaining-requests metadata"))?;
        let remaining_tokens = hints
            .remaining_tokens
            .ok_or_else(|| Error::parse("response missing remaining-tokens metadata"))?;
        let reset_requests = hints
            .reset_requests
            .as_deref()
            .ok_or_else(|| Error::parse("response missing requests-reset metadata"))?;
        let reset_tokens = hints
            .reset_tokens
            .as_deref()
            .ok_or_else(|| Error::parse("response missing tokens-reset metadata"))?;

        let cooldown = parse_reset_hint(reset_requests)?.max(parse_reset_hint(reset_tokens)?);

        let mut st = self.state.lock().await;
        st.remaining_requests = remaining_requests;
        st.remaining_tokens = remaining_tokens;
        st.cooldown = cooldown;
        debug!(
            remaining_requests,
            remaining_tokens,
            cooldown_ms = cooldown.as_millis() as u64,
            "absorbed quota metadata"
        );
        Ok(())
    }

    pub async fn snapshot(&self) -> QuotaSnapshot {
        let st = self.state.lock().await;
        QuotaSnapshot {
            remaining_requests: st.remaining_requests,
            remaining_tokens: st.remaining_tokens,
            cooldown: st.cooldown,
        }
    }
}

/// Parse a provider reset hint (`"850ms"`, `"2s"`, `"7.5s"`) into a duration.
///
/// The `ms` suffix must be tested before `s`. Units other than the two the
/// provider documents are rejected outright rather than guessed at.
pub fn parse_reset_hint(raw: &str) -> Result<Duration> {
    let trimmed = raw.trim();
    if let Some(value) = trimmed.strip_suffix("ms") {
        let millis: f64 = value.parse().map_err(|_| bad_hint(raw))?;
        if !millis.is_finite() || millis < 0.0 {
            return Err(bad_hint(raw));
        }
        return Ok(Duration::from_secs_f64(millis / 1000.0));
    }
    if let Some(value) = trimmed.strip_suffix('s') {
        let secs: f64 = value.parse().map_err(|_| bad_hint(raw))?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(bad_hint(raw));
        }
        return Ok(Duration::from_secs_f64(secs));
    }
    Err(bad_hint(raw))
}

fn bad_hint(raw: &str) -> Error {
    Error::config(format!("unrecognized reset-time unit in {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reset_hint_millis() {
        let d = parse_reset_hint("850ms").unwrap();
        assert_eq!(d, Duration::from_millis(850));
        assert!(d < Duration::from_secs(1));
    }

    #[test]
    fn test_parse_reset_hint_seconds() {
        assert_eq!(parse_reset_hint("2s").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_reset_hint_fractional_seconds() {
        assert_eq!(
            parse_reset_hint("7.5s").unwrap(),
            Duration::from_millis(7500)
        );
    }

    #[test]
    fn test_parse_reset_hint_unknown_unit() {
        for raw in ["6m0s", "1h", "120", "", "ms"] {
            let err = parse_reset_hint(raw).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{raw:?} -> {err}");
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_parse_reset_hint_negative_rejected() {
        assert!(parse_reset_hint("-1s").is_err());
        assert!(parse_reset_hint("-20ms").is_err());
    }

    #[tokio::test]
    async fn test_tracker_starts_without_throttle() {
        let tracker = QuotaTracker::new(QuotaConfig::default());
        assert_eq!(tracker.throttle_hint().await, None);

        let snap = tracker.snapshot().await;
        assert_eq!(snap.remaining_requests, 5000);
        assert_eq!(snap.remaining_tokens, 60_000);
        assert_eq!(snap.cooldown, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_tracker_throttles_when_requests_low() {
        let tracker = QuotaTracker::new(QuotaConfig::default());
        tracker
            .absorb(&QuotaHints::new(3, 50_000, "2s", "850ms"))
            .await
            .unwrap();

        // 3 < 5, so the stored cooldown (max of the two resets) applies.
        assert_eq!(tracker.throttle_hint().await, Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_tracker_throttles_when_tokens_low() {
        let tracker = QuotaTracker::new(QuotaConfig::default());
        tracker
            .absorb(&QuotaHints::new(100, 5999, "850ms", "500ms"))
            .await
            .unwrap();

        assert_eq!(
            tracker.throttle_hint().await,
            Some(Duration::from_millis(850))
        );
    }

    #[tokio::test]
    async fn test_absorb_overwrites_budget() {
        let tracker = QuotaTracker::new(QuotaConfig::default());
        tracker
            .absorb(&QuotaHints::new(42, 9000, "1s", "3s"))
            .await
            .unwrap();

        let snap = tracker.snapshot().await;
        assert_eq!(snap.remaining_requests, 42);
        assert_eq!(snap.remaining_tokens, 9000);
        assert_eq!(snap.cooldown, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_absorb_missing_metadata_is_retryable_and_leaves_state() {
        let tracker = QuotaTracker::new(QuotaConfig::default());
        let before = tracker.snapshot().await;

        let err = tracker.absorb(&QuotaHints::default()).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.is_retryable());
        assert_eq!(tracker.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_absorb_unknown_unit_is_fatal_and_leaves_state() {
        let tracker = QuotaTracker::new(QuotaConfig::default());
        let before = tracker.snapshot().await;

        let err = tracker
            .absorb(&QuotaHints::new(10, 1000, "6m0s", "1s"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.is_retryable());
        assert_eq!(tracker.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_custom_thresholds() {
        let cfg = QuotaConfig::new()
            .with_min_requests(10)
            .with_min_tokens(100)
            .with_initial_budget(9, 1000);
        let tracker = QuotaTracker::new(cfg);

        // 9 < 10 triggers the throttle even though tokens are plentiful.
        assert_eq!(tracker.throttle_hint().await, Some(Duration::ZERO));
    }
}
