//! Dedup/recovery state machine implementation

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use check_result::CheckResult;
use queue_transport::{DedupStore, RefreshOutcome};
use tracing::{debug, warn};

/// Dedup engine configuration
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Minimum time between repeat notifications for one streak.
    /// `None` or zero disables deduplication entirely.
    pub dedup_duration: Option<Duration>,

    /// Streak records expire after `ttl_multiplier x dedup_duration`,
    /// a safety margin so a record outlives any missed check cycle.
    pub ttl_multiplier: u32,

    /// Emit steady-state passing outcomes too (normally dropped).
    pub notify_on_success: bool,

    /// Namespace prefix for store keys.
    pub key_prefix: String,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            dedup_duration: None,
            ttl_multiplier: 10,
            notify_on_success: false,
            key_prefix: "watchtower".to_string(),
        }
    }
}

/// Decorates raw probe outcomes with dedup/recovery state.
///
/// The store is injected so deployments can share state across
/// processes and tests can swap in a double.
pub struct DedupEngine {
    store: Arc<dyn DedupStore>,
    config: DedupConfig,
}

impl DedupEngine {
    pub fn new(store: Arc<dyn DedupStore>, config: DedupConfig) -> Self {
        Self { store, config }
    }

    /// Observe one raw outcome, using the current wall clock.
    ///
    /// Returns the decorated result to emit, or `None` when the
    /// outcome is suppressed.
    pub async fn observe(&self, raw: CheckResult) -> Option<CheckResult> {
        self.observe_with(raw, None).await
    }

    /// Observe with a per-check dedup window override; `None` falls
    /// back to the engine's configured window.
    pub async fn observe_with(
        &self,
        raw: CheckResult,
        window_override: Option<Duration>,
    ) -> Option<CheckResult> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.observe_at_with(raw, now, window_override).await
    }

    /// Observe one raw outcome at an explicit timestamp.
    pub async fn observe_at(&self, raw: CheckResult, now: i64) -> Option<CheckResult> {
        self.observe_at_with(raw, now, None).await
    }

    async fn observe_at_with(
        &self,
        raw: CheckResult,
        now: i64,
        window_override: Option<Duration>,
    ) -> Option<CheckResult> {
        let raw = undecorated(raw);

        let window = match window_override.or(self.config.dedup_duration) {
            Some(d) if !d.is_zero() => d,
            // Dedup disabled: report every failure independently.
            _ => {
                return if raw.is_failure() {
                    Some(raw)
                } else {
                    self.config.notify_on_success.then_some(raw)
                };
            }
        };

        let hash = raw.fingerprint();
        if raw.is_failure() {
            self.observe_failure(raw, &hash, now, window).await
        } else {
            self.observe_pass(raw, &hash).await
        }
    }

    async fn observe_failure(
        &self,
        raw: CheckResult,
        hash: &str,
        now: i64,
        window: Duration,
    ) -> Option<CheckResult> {
        let ttl = window * self.config.ttl_multiplier;

        // Keep the streak record alive for as long as failures keep
        // coming in.
        if let Err(e) = self.store.put(&self.streak_key(hash), now, ttl).await {
            warn!(error = %e, "dedup store unreachable, failing open");
            return Some(fresh_firing(raw, now));
        }

        // The first-error timestamp is written once per streak and
        // carried through every duplicate of that streak.
        let first_error = match self
            .store
            .get_or_put(&self.first_error_key(hash), now, ttl)
            .await
        {
            Ok(first) => first,
            Err(e) => {
                warn!(error = %e, "dedup store unreachable, failing open");
                return Some(fresh_firing(raw, now));
            }
        };

        let outcome = match self
            .store
            .refresh_if_elapsed(&self.last_alert_key(hash), now, window.as_secs() as i64, ttl)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "dedup store unreachable, failing open");
                return Some(fresh_firing(raw, now));
            }
        };

        match outcome {
            RefreshOutcome::Suppressed { last } => {
                debug!(
                    fingerprint = hash,
                    last_alert = last,
                    "suppressing duplicate failure"
                );
                None
            }
            RefreshOutcome::Refreshed { previous } => {
                let mut emitted = raw;
                emitted.is_dedup = previous.is_some();
                emitted.first_error_time = Some(first_error);
                Some(emitted)
            }
        }
    }

    async fn observe_pass(&self, raw: CheckResult, hash: &str) -> Option<CheckResult> {
        let streak_live = match self.store.get(&self.streak_key(hash)).await {
            Ok(value) => value.is_some(),
            Err(e) => {
                warn!(error = %e, "dedup store unreachable, failing open");
                false
            }
        };

        if !streak_live {
            return self.config.notify_on_success.then_some(raw);
        }

        // Streak over: clear its records and report the recovery once.
        for key in [
            self.streak_key(hash),
            self.first_error_key(hash),
            self.last_alert_key(hash),
        ] {
            if let Err(e) = self.store.delete(&key).await {
                warn!(key, error = %e, "failed to clear dedup record");
            }
        }

        debug!(fingerprint = hash, "streak recovered");
        let mut emitted = raw;
        emitted.recovered = true;
        Some(emitted)
    }

    fn streak_key(&self, hash: &str) -> String {
        format!("{}.dedup-cache.{}", self.config.key_prefix, hash)
    }

    fn first_error_key(&self, hash: &str) -> String {
        format!("{}.dedup-first-error.{}", self.config.key_prefix, hash)
    }

    fn last_alert_key(&self, hash: &str) -> String {
        format!("{}.dedup-last-alert.{}", self.config.key_prefix, hash)
    }
}

/// Strip any decoration so the engine always starts from a raw
/// pass/fail outcome.
fn undecorated(mut raw: CheckResult) -> CheckResult {
    raw.is_dedup = false;
    raw.recovered = false;
    raw.first_error_time = None;
    raw
}

/// The fail-open emission: a fresh, un-deduplicated firing.
fn fresh_firing(mut raw: CheckResult, now: i64) -> CheckResult {
    raw.is_dedup = false;
    raw.first_error_time = Some(now);
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use check_result::ResultKind;
    use queue_transport::{MemoryDedupStore, TransportError};

    fn engine_with(config: DedupConfig) -> DedupEngine {
        DedupEngine::new(Arc::new(MemoryDedupStore::new()), config)
    }

    fn thirty_second_window() -> DedupConfig {
        DedupConfig {
            dedup_duration: Some(Duration::from_secs(30)),
            ..Default::default()
        }
    }

    fn fail_at(time: i64) -> CheckResult {
        CheckResult::failure("host must run pop3", "host", "pop3", "", time, "no banner")
    }

    fn pass_at(time: i64) -> CheckResult {
        CheckResult::success("host must run pop3", "host", "pop3", "", time)
    }

    #[tokio::test]
    async fn test_streak_timeline() {
        let engine = engine_with(thirty_second_window());

        // first failure fires
        let fired = engine.observe_at(fail_at(100), 100).await.unwrap();
        assert!(!fired.is_dedup);
        assert_eq!(fired.first_error_time, Some(100));
        assert_eq!(fired.kind(), ResultKind::NewFailure);

        // 5s later: inside the window, suppressed
        assert!(engine.observe_at(fail_at(105), 105).await.is_none());

        // 40s after the first alert: duplicate, original first-error kept
        let dup = engine.observe_at(fail_at(140), 140).await.unwrap();
        assert!(dup.is_dedup);
        assert_eq!(dup.first_error_time, Some(100));
        assert_eq!(dup.kind(), ResultKind::DuplicateFailure);

        // pass: exactly one recovery
        let recovered = engine.observe_at(pass_at(150), 150).await.unwrap();
        assert!(recovered.recovered);
        assert!(recovered.error.is_none());
        assert!(recovered.first_error_time.is_none());
        assert_eq!(recovered.kind(), ResultKind::Recovery);

        // further passes are steady state, not recoveries
        assert!(engine.observe_at(pass_at(160), 160).await.is_none());
    }

    #[tokio::test]
    async fn test_new_streak_after_recovery_gets_new_first_error() {
        let engine = engine_with(thirty_second_window());

        engine.observe_at(fail_at(100), 100).await.unwrap();
        engine.observe_at(pass_at(110), 110).await.unwrap();

        let fired = engine.observe_at(fail_at(200), 200).await.unwrap();
        assert!(!fired.is_dedup);
        assert_eq!(fired.first_error_time, Some(200));
    }

    #[tokio::test]
    async fn test_plain_success_without_streak_is_silent() {
        let engine = engine_with(thirty_second_window());
        assert!(engine.observe_at(pass_at(100), 100).await.is_none());
    }

    #[tokio::test]
    async fn test_notify_on_success() {
        let engine = engine_with(DedupConfig {
            notify_on_success: true,
            ..thirty_second_window()
        });
        let emitted = engine.observe_at(pass_at(100), 100).await.unwrap();
        assert_eq!(emitted.kind(), ResultKind::Success);
    }

    #[tokio::test]
    async fn test_dedup_disabled_reports_every_failure() {
        let engine = engine_with(DedupConfig::default());

        for time in [100, 101, 102] {
            let fired = engine.observe_at(fail_at(time), time).await.unwrap();
            assert!(!fired.is_dedup);
        }
        // no streak tracking without dedup: passes stay silent
        assert!(engine.observe_at(pass_at(103), 103).await.is_none());
    }

    #[tokio::test]
    async fn test_zero_duration_means_disabled() {
        let engine = engine_with(DedupConfig {
            dedup_duration: Some(Duration::ZERO),
            ..Default::default()
        });
        assert!(engine.observe_at(fail_at(100), 100).await.is_some());
        assert!(engine.observe_at(fail_at(101), 101).await.is_some());
    }

    #[tokio::test]
    async fn test_fingerprints_are_independent() {
        let engine = engine_with(thirty_second_window());

        engine.observe_at(fail_at(100), 100).await.unwrap();

        // a different check firing at the same instant is not suppressed
        let other = CheckResult::failure("other must run ssl", "other", "ssl", "", 101, "boom");
        assert!(engine.observe_at(other, 101).await.is_some());
    }

    struct BrokenStore;

    #[async_trait]
    impl DedupStore for BrokenStore {
        async fn get(&self, _: &str) -> Result<Option<i64>, TransportError> {
            Err(TransportError::Store("down".into()))
        }
        async fn put(&self, _: &str, _: i64, _: Duration) -> Result<(), TransportError> {
            Err(TransportError::Store("down".into()))
        }
        async fn delete(&self, _: &str) -> Result<(), TransportError> {
            Err(TransportError::Store("down".into()))
        }
        async fn get_or_put(&self, _: &str, _: i64, _: Duration) -> Result<i64, TransportError> {
            Err(TransportError::Store("down".into()))
        }
        async fn refresh_if_elapsed(
            &self,
            _: &str,
            _: i64,
            _: i64,
            _: Duration,
        ) -> Result<RefreshOutcome, TransportError> {
            Err(TransportError::Store("down".into()))
        }
    }

    #[tokio::test]
    async fn test_fails_open_when_store_unreachable() {
        let engine = DedupEngine::new(Arc::new(BrokenStore), thirty_second_window());

        // every failure comes through as a fresh firing
        for time in [100, 101] {
            let fired = engine.observe_at(fail_at(time), time).await.unwrap();
            assert!(!fired.is_dedup);
            assert_eq!(fired.first_error_time, Some(time));
        }

        // passes never turn into phantom recoveries
        assert!(engine.observe_at(pass_at(102), 102).await.is_none());
    }
}
