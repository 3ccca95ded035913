//! Resilient wrapper around any [`MarketplaceClient`].
//!
//! Composition order per call: circuit-breaker gate, then the retry-wrapped
//! attempt (cadence wait, identity injection, the network call), then
//! identity-rotation feedback from the outcome.

use std::sync::Arc;

use tracing::debug;

use crate::port::{MarketplaceClient, SearchPage, SearchQuery};
use crate::resilience::antibot::AntiBotSystem;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::resilience::retry::RetryManager;
use crate::error::Result;
use crate::shutdown::Shutdown;

/// A [`MarketplaceClient`] wrapped with anti-bot gating, circuit breaking,
/// and retry-with-backoff.
pub struct ResilientClient<C> {
    inner: C,
    antibot: Arc<AntiBotSystem>,
    breaker: CircuitBreaker,
    retry: RetryManager,
}

impl<C: MarketplaceClient> ResilientClient<C> {
    pub fn new(
        inner: C,
        antibot: Arc<AntiBotSystem>,
        breaker: CircuitBreaker,
        retry: RetryManager,
    ) -> Self {
        Self {
            inner,
            antibot,
            breaker,
            retry,
        }
    }

    /// Authenticate with the marketplace under the full resilience stack.
    pub async fn authenticate(&self, shutdown: &Shutdown) -> Result<()> {
        self.breaker
            .execute(|| async {
                self.retry
                    .execute_with_retry("marketplace auth", shutdown, || async {
                        self.antibot.wait_for_slot(shutdown).await?;
                        self.inner.authenticate().await
                    })
                    .await
            })
            .await
    }

    /// Run a search under the full resilience stack.
    ///
    /// Each attempt waits out the human-like cadence, picks a (possibly
    /// rotated) identity, and feeds the outcome back into the success
    /// tracker. A soft-blocked response surfaces as an error from the
    /// adapter and therefore counts as a failed attempt here.
    pub async fn search(&self, query: &SearchQuery, shutdown: &Shutdown) -> Result<SearchPage> {
        self.breaker
            .execute(|| async {
                self.retry
                    .execute_with_retry("marketplace search", shutdown, || async {
                        self.antibot.wait_for_slot(shutdown).await?;
                        let identity = self.antibot.identity_with_rotation().await?;
                        debug!(identity_id = identity.id, query = %query.query, "dispatching search");

                        let result = self.inner.search(query, &identity).await;
                        self.antibot
                            .record_outcome(identity.id, result.is_ok())
                            .await;
                        result
                    })
                    .await
            })
            .await
    }

    /// Current breaker state. Observability only.
    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Force the breaker closed. Operator use.
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }
}
