//! Shared fixtures for the integration suites.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;

use bidwatch::config::{
    CircuitBreakerConfig, DedupConfig, IdentityConfig, RateLimitConfig, RetryConfig,
    SchedulerConfig, TimingConfig,
};
use bidwatch::dedup::DeduplicationEngine;
use bidwatch::port::MarketplaceClient;
use bidwatch::resilience::{AntiBotSystem, CircuitBreaker, ResilientClient, RetryManager};
use bidwatch::scheduler::Scheduler;
use bidwatch::shutdown::{self, Shutdown, ShutdownSignal};
use bidwatch::testkit::MemoryStore;

/// Rate limit generous enough to never stall a test.
pub fn open_rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        requests_per_minute: 60_000,
        burst: 1_000,
    }
}

/// Millisecond-scale timing so tests run fast.
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        base_interval_ms: 1,
        min_jitter_ms: 0,
        max_jitter_ms: 1,
        human_variation: false,
    }
}

pub fn identity_config() -> IdentityConfig {
    IdentityConfig {
        rotation_interval_secs: 300,
        min_success_rate: 0.7,
    }
}

/// A breaker that effectively never opens.
pub fn lenient_breaker() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 1_000,
        success_threshold: 1,
        reset_timeout_ms: 10,
        probe_timeout_ms: 30_000,
    }
}

pub fn no_retries() -> RetryConfig {
    RetryConfig {
        max_retries: 0,
        base_delay_ms: 1,
        max_delay_ms: 2,
    }
}

/// Scheduler settings tuned for tests: no jitter padding, fast attempts.
pub fn fast_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        worker_count: 2,
        queue_size: 16,
        cycle_interval_secs: 300,
        base_delay_secs: 0,
        min_jitter_secs: 0,
        max_jitter_secs: 0,
        humanize: false,
        max_pending_timers: 100,
        max_retries: 0,
        attempt_delay_secs: 0,
        attempt_delay_cap_secs: 1,
        execution_timeout_secs: 60,
        requeue_delay_secs: 60,
        requeue_jitter_secs: 0,
        page_size: 50,
    }
}

/// Wrap a mock client in the full resilience stack over `store`.
pub fn resilient<C: MarketplaceClient>(store: Arc<MemoryStore>, client: C) -> ResilientClient<C> {
    ResilientClient::new(
        client,
        Arc::new(AntiBotSystem::new(
            store,
            &open_rate_limit(),
            fast_timing(),
            identity_config(),
        )),
        CircuitBreaker::new(lenient_breaker()),
        RetryManager::new(no_retries()),
    )
}

/// A full scheduler over in-memory storage and the given mock client.
pub fn scheduler<C: MarketplaceClient + 'static>(
    store: Arc<MemoryStore>,
    client: C,
    config: SchedulerConfig,
) -> (Arc<Scheduler<C>>, ShutdownSignal, Shutdown) {
    let (signal, shutdown) = shutdown::channel();
    let dedup = Arc::new(DeduplicationEngine::new(store.clone(), DedupConfig::default()));
    let scheduler = Arc::new(Scheduler::new(
        store,
        Arc::new(resilient_with_shutdown(client)),
        dedup,
        config,
        shutdown.clone(),
    ));
    (scheduler, signal, shutdown)
}

fn resilient_with_shutdown<C: MarketplaceClient>(client: C) -> ResilientClient<C> {
    resilient(Arc::new(MemoryStore::new()), client)
}
