//! Anti-detection composition layer.
//!
//! Combines the token bucket, human-like timing, per-identity success
//! tracking, and a periodically refreshed client identity cache. When the
//! identity store is unreachable the cache degrades to a small built-in
//! user-agent list rather than stalling the pipeline.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::{IdentityConfig, RateLimitConfig, TimingConfig};
use crate::domain::ClientIdentity;
use crate::error::{ResilienceError, Result};
use crate::port::IdentityStore;
use crate::resilience::rate_limiter::RateLimiter;
use crate::resilience::success::SuccessTracker;
use crate::resilience::timing::TimingManager;
use crate::shutdown::Shutdown;

/// Built-in identities used when the store cannot provide any.
const FALLBACK_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

/// Body phrases that mark a nominally successful response as a soft block.
const BLOCKING_PHRASES: &[&str] = &[
    "access denied",
    "captcha",
    "cloudflare",
    "blocked",
    "rate limit",
    "unusual traffic",
    "bot detected",
];

/// Poll interval while waiting for a rate-limit token.
const TOKEN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// True when a response looks like automated-traffic blocking.
///
/// Status 401/403/429 always counts; otherwise the body is scanned for a
/// fixed set of case-insensitive blocking phrases.
pub fn is_blocking_response(status: u16, body: &str) -> bool {
    if matches!(status, 401 | 403 | 429) {
        return true;
    }
    let lowered = body.to_lowercase();
    BLOCKING_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Anti-detection layer gating every outbound marketplace call.
pub struct AntiBotSystem {
    rate_limiter: RateLimiter,
    timing: TimingManager,
    tracker: SuccessTracker,
    identities: Mutex<Vec<ClientIdentity>>,
    store: Arc<dyn IdentityStore>,
    config: IdentityConfig,
}

impl AntiBotSystem {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        rate_limit: &RateLimitConfig,
        timing: TimingConfig,
        identity: IdentityConfig,
    ) -> Self {
        Self {
            rate_limiter: RateLimiter::new(rate_limit),
            timing: TimingManager::new(timing),
            tracker: SuccessTracker::new(),
            identities: Mutex::new(fallback_identities()),
            store,
            config: identity,
        }
    }

    /// Reload the identity cache from the store.
    ///
    /// On failure (or an empty result) the existing cache is kept, falling
    /// back to the built-in list if there is nothing cached at all.
    pub async fn refresh_identities(&self) {
        match self.store.active_identities().await {
            Ok(identities) if !identities.is_empty() => {
                debug!(count = identities.len(), "identity cache refreshed");
                *self.identities.lock() = identities;
            }
            Ok(_) => {
                warn!("identity store returned no active identities, keeping cache");
                self.ensure_fallback();
            }
            Err(err) => {
                warn!(error = %err, "identity refresh failed, keeping cache");
                self.ensure_fallback();
            }
        }
    }

    /// Background loop refreshing the cache until shutdown.
    pub async fn run_refresh_loop(self: Arc<Self>, shutdown: Shutdown) {
        let mut interval = tokio::time::interval(self.config.rotation_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => self.refresh_identities().await,
                _ = shutdown.cancelled() => {
                    debug!("identity refresh loop stopping");
                    return;
                }
            }
        }
    }

    /// Pick the identity to use for the next request.
    ///
    /// Prefers the cached identity with the best tracked success rate above
    /// the configured minimum; otherwise a uniformly random cached identity;
    /// otherwise delegates to the store's random pick.
    pub async fn identity_with_rotation(&self) -> Result<ClientIdentity> {
        let cached: Vec<ClientIdentity> = self.identities.lock().clone();

        if let Some(best_id) = self.tracker.best_identity(self.config.min_success_rate) {
            if let Some(identity) = cached.iter().find(|i| i.id == best_id) {
                return Ok(identity.clone());
            }
        }

        if !cached.is_empty() {
            let index = rand::thread_rng().gen_range(0..cached.len());
            return Ok(cached[index].clone());
        }

        self.store.random_identity().await
    }

    /// Feed a request outcome back into tracking, cadence, and usage counts.
    pub async fn record_outcome(&self, identity_id: i64, success: bool) {
        self.tracker.record(identity_id, success);
        self.timing.adjust_variance(success);
        // Fallback identities have negative ids and no store row to bump.
        if identity_id > 0 {
            if let Err(err) = self.store.bump_identity_usage(identity_id).await {
                debug!(identity_id, error = %err, "usage bump failed");
            }
        }
    }

    /// Wait out the human-like delay, then poll for a rate-limit token.
    ///
    /// Returns a cancellation error if shutdown fires while waiting.
    pub async fn wait_for_slot(&self, shutdown: &Shutdown) -> Result<()> {
        let delay = self.timing.adaptive_delay();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => return Err(ResilienceError::Cancelled.into()),
        }
        loop {
            if self.rate_limiter.allow_request() {
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(TOKEN_POLL_INTERVAL) => {}
                _ = shutdown.cancelled() => return Err(ResilienceError::Cancelled.into()),
            }
        }
    }

    /// Copy of the tracked success rates. Observability only.
    pub fn success_rates(&self) -> std::collections::HashMap<i64, f64> {
        self.tracker.snapshot()
    }

    /// Number of identities currently cached.
    pub fn cached_identity_count(&self) -> usize {
        self.identities.lock().len()
    }

    fn ensure_fallback(&self) {
        let mut cache = self.identities.lock();
        if cache.is_empty() {
            *cache = fallback_identities();
        }
    }
}

fn fallback_identities() -> Vec<ClientIdentity> {
    FALLBACK_USER_AGENTS
        .iter()
        .enumerate()
        .map(|(index, ua)| ClientIdentity::new(-(index as i64 + 1), *ua))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingIdentityStore;

    #[async_trait]
    impl IdentityStore for FailingIdentityStore {
        async fn active_identities(&self) -> Result<Vec<ClientIdentity>> {
            Err(crate::error::Error::Connection("store down".into()))
        }

        async fn random_identity(&self) -> Result<ClientIdentity> {
            Err(crate::error::Error::Connection("store down".into()))
        }

        async fn bump_identity_usage(&self, _id: i64) -> Result<()> {
            Ok(())
        }
    }

    struct FixedIdentityStore {
        identities: Vec<ClientIdentity>,
        bumps: AtomicU32,
    }

    #[async_trait]
    impl IdentityStore for FixedIdentityStore {
        async fn active_identities(&self) -> Result<Vec<ClientIdentity>> {
            Ok(self.identities.clone())
        }

        async fn random_identity(&self) -> Result<ClientIdentity> {
            Ok(self.identities[0].clone())
        }

        async fn bump_identity_usage(&self, _id: i64) -> Result<()> {
            self.bumps.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn system(store: Arc<dyn IdentityStore>) -> AntiBotSystem {
        AntiBotSystem::new(
            store,
            &RateLimitConfig {
                requests_per_minute: 6_000,
                burst: 100,
            },
            TimingConfig {
                base_interval_ms: 1,
                min_jitter_ms: 0,
                max_jitter_ms: 1,
                human_variation: false,
            },
            IdentityConfig {
                rotation_interval_secs: 300,
                min_success_rate: 0.7,
            },
        )
    }

    #[test]
    fn blocking_statuses_detected() {
        for status in [401, 403, 429] {
            assert!(is_blocking_response(status, ""));
        }
        assert!(!is_blocking_response(200, "all fine"));
        assert!(!is_blocking_response(500, "server error"));
    }

    #[test]
    fn blocking_phrases_detected_case_insensitively() {
        assert!(is_blocking_response(200, "Access Denied"));
        assert!(is_blocking_response(200, "please solve this CAPTCHA"));
        assert!(is_blocking_response(200, "checking with Cloudflare..."));
        assert!(!is_blocking_response(200, "<html>42 results</html>"));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_fallback_identities() {
        let system = system(Arc::new(FailingIdentityStore));
        system.refresh_identities().await;
        assert_eq!(system.cached_identity_count(), FALLBACK_USER_AGENTS.len());

        // Rotation still yields an identity even with the store down.
        let identity = system.identity_with_rotation().await.unwrap();
        assert!(identity.id < 0);
    }

    #[tokio::test]
    async fn refresh_replaces_cache_from_store() {
        let store = Arc::new(FixedIdentityStore {
            identities: vec![
                ClientIdentity::new(1, "agent-one"),
                ClientIdentity::new(2, "agent-two"),
            ],
            bumps: AtomicU32::new(0),
        });
        let system = system(store);
        system.refresh_identities().await;
        assert_eq!(system.cached_identity_count(), 2);
    }

    #[tokio::test]
    async fn rotation_prefers_best_tracked_identity() {
        let store = Arc::new(FixedIdentityStore {
            identities: vec![
                ClientIdentity::new(1, "agent-one"),
                ClientIdentity::new(2, "agent-two"),
            ],
            bumps: AtomicU32::new(0),
        });
        let system = system(store);
        system.refresh_identities().await;

        // Identity 1 degrades below the minimum; identity 2 stays healthy.
        for _ in 0..10 {
            system.record_outcome(1, false).await;
        }
        system.record_outcome(2, true).await;

        for _ in 0..5 {
            let identity = system.identity_with_rotation().await.unwrap();
            assert_eq!(identity.id, 2);
        }
    }

    #[tokio::test]
    async fn outcomes_bump_usage_for_store_identities() {
        let store = Arc::new(FixedIdentityStore {
            identities: vec![ClientIdentity::new(1, "agent-one")],
            bumps: AtomicU32::new(0),
        });
        let system = system(store.clone());
        system.record_outcome(1, true).await;
        system.record_outcome(-1, true).await;
        assert_eq!(store.bumps.load(Ordering::SeqCst), 1);
    }
}
