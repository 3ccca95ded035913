//! App orchestration module.
//!
//! Wires the persistence, resilience, and scheduling layers together and
//! runs them until a shutdown signal arrives.

use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};

use crate::adapter::http::HttpMarketplaceClient;
use crate::adapter::sqlite::{create_pool, run_migrations, SqliteStore};
use crate::config::Config;
use crate::dedup::DeduplicationEngine;
use crate::error::Result;
use crate::resilience::{AntiBotSystem, CircuitBreaker, ResilientClient, RetryManager};
use crate::scheduler::Scheduler;
use crate::shutdown;

pub use crate::shutdown::{Shutdown, ShutdownSignal};

/// Main application struct.
pub struct App;

impl App {
    /// Run the watcher until ctrl-c.
    ///
    /// Opens the database, authenticates once, and starts the identity
    /// refresh loop and the scheduler. Both loops are joined before this
    /// returns so in-flight work finishes cleanly.
    pub async fn run(config: Config) -> Result<()> {
        let pool = create_pool(&config.database.url)?;
        run_migrations(&pool)?;
        let store = Arc::new(SqliteStore::new(pool));

        let antibot = Arc::new(AntiBotSystem::new(
            store.clone(),
            &config.rate_limit,
            config.timing.clone(),
            config.identity.clone(),
        ));
        antibot.refresh_identities().await;

        let client = Arc::new(ResilientClient::new(
            HttpMarketplaceClient::new(config.marketplace.clone())?,
            antibot.clone(),
            CircuitBreaker::new(config.circuit_breaker.clone()),
            RetryManager::new(config.retry.clone()),
        ));

        let dedup = Arc::new(DeduplicationEngine::new(
            store.clone(),
            config.dedup.clone(),
        ));

        let (signal, shutdown) = shutdown::channel();

        if let Err(err) = client.authenticate(&shutdown).await {
            // Searches may still work anonymously; the resilience layer
            // deals with the consequences per call.
            warn!(error = %err, "initial authentication failed");
        }

        let scheduler = Arc::new(Scheduler::new(
            store,
            client,
            dedup,
            config.scheduler.clone(),
            shutdown.clone(),
        ));

        let refresh = tokio::spawn(antibot.clone().run_refresh_loop(shutdown.clone()));
        let engine = tokio::spawn(scheduler.clone().run());
        scheduler.run_cycle().await;

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("shutdown signal received");
                signal.trigger();
            }
            _ = shutdown.cancelled() => {}
        }

        let _ = engine.await;
        let _ = refresh.await;
        Ok(())
    }
}
