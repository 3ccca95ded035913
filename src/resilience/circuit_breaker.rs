//! Three-state circuit breaker guarding the marketplace client.
//!
//! Closed admits everything; `failure_threshold` consecutive failures open
//! the breaker; after `reset_timeout` a single half-open probe is allowed,
//! and `success_threshold` consecutive probe successes close it again. A
//! fault (including a panic) inside the guarded future counts as an ordinary
//! failure rather than tearing down the worker.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::CircuitBreakerConfig;
use crate::error::{Error, ResilienceError, Result};

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation; calls are admitted.
    Closed,
    /// Failing fast; calls are rejected until the reset timeout elapses.
    Open,
    /// One trial call at a time is admitted to test recovery.
    HalfOpen,
}

/// How a call was admitted.
enum Admission {
    Normal,
    Probe,
}

struct BreakerInner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    last_failure: Option<Instant>,
    last_transition: Instant,
    probe_in_flight: bool,
}

impl BreakerInner {
    fn transition(&mut self, to: CircuitState) {
        debug!(from = ?self.state, to = ?to, "circuit breaker transition");
        self.state = to;
        self.last_transition = Instant::now();
        // Counters never survive a state change.
        self.failures = 0;
        self.successes = 0;
    }
}

/// Circuit breaker with a single-probe half-open state.
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                last_failure: None,
                last_transition: Instant::now(),
                probe_in_flight: false,
            }),
            config,
        }
    }

    /// Run `f` under the breaker.
    ///
    /// Rejected fast with [`ResilienceError::CircuitOpen`] while Open, and
    /// with [`ResilienceError::ProbeInFlight`] when a half-open probe is
    /// already running. Half-open probes are additionally bounded by the
    /// configured probe timeout. The lock is never held across the call.
    pub async fn execute<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let admission = self.admit()?;
        let guarded = AssertUnwindSafe(f()).catch_unwind();

        let outcome = match admission {
            Admission::Probe => match timeout(self.config.probe_timeout(), guarded).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.on_failure();
                    return Err(Error::Timeout(self.config.probe_timeout()));
                }
            },
            Admission::Normal => guarded.await,
        };

        match outcome {
            Ok(Ok(value)) => {
                self.on_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                self.on_failure();
                Err(err)
            }
            Err(panic) => {
                self.on_failure();
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                warn!(message = %message, "guarded call panicked, counted as failure");
                Err(ResilienceError::Fault(message).into())
            }
        }
    }

    /// Force the breaker Closed with zeroed counters. Operator use.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        info!("circuit breaker reset by operator");
        inner.transition(CircuitState::Closed);
        inner.probe_in_flight = false;
        inner.last_failure = None;
    }

    /// Current state. Non-mutating observer.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Whether a call would currently be admitted. Non-mutating observer.
    pub fn is_available(&self) -> bool {
        let inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => !inner.probe_in_flight,
            CircuitState::Open => {
                inner.last_transition.elapsed() >= self.config.reset_timeout()
            }
        }
    }

    /// Consecutive failure count in the current state.
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failures
    }

    /// Consecutive success count in the current state.
    pub fn success_count(&self) -> u32 {
        self.inner.lock().successes
    }

    fn admit(&self) -> Result<Admission> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::Open => {
                if inner.last_transition.elapsed() >= self.config.reset_timeout() {
                    inner.transition(CircuitState::HalfOpen);
                    inner.probe_in_flight = true;
                    Ok(Admission::Probe)
                } else {
                    Err(ResilienceError::CircuitOpen.into())
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(ResilienceError::ProbeInFlight.into())
                } else {
                    inner.probe_in_flight = true;
                    Ok(Admission::Probe)
                }
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock();
        inner.failures = 0;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.probe_in_flight = false;
                inner.successes += 1;
                if inner.successes >= self.config.success_threshold {
                    info!("circuit breaker recovered, closing");
                    inner.transition(CircuitState::Closed);
                }
            }
            CircuitState::Closed => {
                inner.successes += 1;
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock();
        inner.successes = 0;
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::HalfOpen => {
                inner.probe_in_flight = false;
                warn!("half-open probe failed, reopening circuit breaker");
                inner.transition(CircuitState::Open);
            }
            CircuitState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.config.failure_threshold {
                    warn!(
                        failures = inner.failures,
                        "failure threshold reached, opening circuit breaker"
                    );
                    inner.transition(CircuitState::Open);
                }
            }
            CircuitState::Open => {}
        }
    }
}
