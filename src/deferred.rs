//! Deferred settlement
//!
//! Turns a value into a pending operation that completes after a simulated
//! network delay, either successfully or with a failure carrying the value.
//! The deadline is fixed when the operation is created, so several
//! outstanding settlements complete in deadline order regardless of the
//! order in which they are awaited.

use std::future::Future;

use once_cell::sync::Lazy;
use tracing::trace;

use crate::config::DelayConfig;

static GLOBAL: Lazy<Settler> = Lazy::new(Settler::from_env);

/// Schedules delayed settlements according to a [`DelayConfig`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settler {
    delay: DelayConfig,
}

impl Settler {
    /// Create a new settler with the given delay configuration
    pub fn new(delay: DelayConfig) -> Self {
        Self { delay }
    }

    /// Settler configured from the environment (`FICTIVE_TEST`)
    pub fn from_env() -> Self {
        Self::new(DelayConfig::from_env())
    }

    /// Process-wide settler used by the free functions of this module.
    ///
    /// Built from the environment on first use.
    pub fn global() -> &'static Settler {
        &GLOBAL
    }

    /// Settle with `outcome` once the delay has elapsed.
    ///
    /// The timer starts now, not on first poll. Must be called from within
    /// a tokio runtime.
    pub fn after_delay<T, E>(
        self,
        outcome: Result<T, E>,
        delay_ms: Option<u64>,
    ) -> impl Future<Output = Result<T, E>> {
        let delay = self.delay.effective(delay_ms);
        let succeeded = outcome.is_ok();
        let sleep = tokio::time::sleep(delay);
        trace!(?delay, succeeded, "settlement scheduled");

        async move {
            sleep.await;
            trace!(?delay, succeeded, "settled");
            outcome
        }
    }

    /// Settle with `value` after the delay.
    ///
    /// Only `succeed == Some(false)` fails; leaving it out means success.
    pub fn settle_after_delay<T>(
        self,
        value: T,
        delay_ms: Option<u64>,
        succeed: Option<bool>,
    ) -> impl Future<Output = Result<T, T>> {
        let outcome = match succeed {
            Some(false) => Err(value),
            _ => Ok(value),
        };
        self.after_delay(outcome, delay_ms)
    }

    pub fn resolve_after_delay<T, E>(
        self,
        value: T,
        delay_ms: Option<u64>,
    ) -> impl Future<Output = Result<T, E>> {
        self.after_delay(Ok(value), delay_ms)
    }

    pub fn reject_after_delay<T, E>(
        self,
        value: E,
        delay_ms: Option<u64>,
    ) -> impl Future<Output = Result<T, E>> {
        self.after_delay(Err(value), delay_ms)
    }
}

/// Complete successfully with `value` after `delay_ms` (200 ms by default).
pub fn resolve_after_delay<T, E>(
    value: T,
    delay_ms: Option<u64>,
) -> impl Future<Output = Result<T, E>> {
    Settler::global().resolve_after_delay(value, delay_ms)
}

/// Fail with `value` as the payload after `delay_ms` (200 ms by default).
pub fn reject_after_delay<T, E>(
    value: E,
    delay_ms: Option<u64>,
) -> impl Future<Output = Result<T, E>> {
    Settler::global().reject_after_delay(value, delay_ms)
}

/// See [`Settler::settle_after_delay`].
pub fn settle_after_delay<T>(
    value: T,
    delay_ms: Option<u64>,
    succeed: Option<bool>,
) -> impl Future<Output = Result<T, T>> {
    Settler::global().settle_after_delay(value, delay_ms, succeed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_resolve_waits_for_delay() {
        let settler = Settler::default();
        let start = Instant::now();

        let result = settler.resolve_after_delay::<_, ()>(42, Some(150)).await;

        assert_eq!(result, Ok(42));
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_delay_is_200ms() {
        let settler = Settler::default();
        let start = Instant::now();

        let result = settler.resolve_after_delay::<_, ()>("done", None).await;

        assert_eq!(result, Ok("done"));
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reject_carries_payload() {
        let settler = Settler::default();
        let payload = json!({"code": 500, "message": "boom"});
        let start = Instant::now();

        let result = settler
            .reject_after_delay::<(), _>(payload.clone(), Some(80))
            .await;

        assert_eq!(result, Err(payload));
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_explicit_false_fails() {
        let settler = Settler::default();

        assert_eq!(settler.settle_after_delay(1, Some(10), None).await, Ok(1));
        assert_eq!(
            settler.settle_after_delay(2, Some(10), Some(true)).await,
            Ok(2)
        );
        assert_eq!(
            settler.settle_after_delay(3, Some(10), Some(false)).await,
            Err(3)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_mode_skips_delay() {
        let settler = Settler::new(DelayConfig::testing());
        let start = Instant::now();

        let resolved = settler.resolve_after_delay::<_, ()>("fast", Some(10_000)).await;
        let rejected = settler.reject_after_delay::<(), _>("nope", None).await;

        assert_eq!(resolved, Ok("fast"));
        assert_eq!(rejected, Err("nope"));
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_env_var_makes_settler_instant() {
        let mut delay = DelayConfig::default();
        delay.apply_lookup(|key| (key == "FICTIVE_TEST").then(|| "1".to_string()));
        let settler = Settler::new(delay);
        let start = Instant::now();

        let result = settler.resolve_after_delay::<_, ()>(1, Some(10_000)).await;

        assert_eq!(result, Ok(1));
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fixed_at_creation() {
        let settler = Settler::default();
        let start = Instant::now();

        let pending = settler.resolve_after_delay::<_, ()>("early", Some(150));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let result = pending.await;

        assert_eq!(result, Ok("early"));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settles_in_deadline_order() {
        let settler = Settler::default();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        for (label, delay) in [("slow", 300), ("fast", 100), ("medium", 200)] {
            let tx = tx.clone();
            let pending = settler.resolve_after_delay::<_, ()>(label, Some(delay));
            tokio::spawn(async move {
                let _ = tx.send(pending.await);
            });
        }
        drop(tx);

        let mut order = Vec::new();
        while let Some(result) = rx.recv().await {
            order.push(result.unwrap());
        }
        assert_eq!(order, vec!["fast", "medium", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_free_functions_pass_payload_through() {
        let record = json!({"id": 7, "tags": ["a", "b"]});

        let ok = resolve_after_delay::<_, ()>(record.clone(), Some(1)).await;
        let err = reject_after_delay::<(), _>(record.clone(), Some(1)).await;
        let settled = settle_after_delay(record.clone(), Some(1), Some(false)).await;

        assert_eq!(ok, Ok(record.clone()));
        assert_eq!(err, Err(record.clone()));
        assert_eq!(settled, Err(record));
    }
}
