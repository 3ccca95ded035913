//! Periodic search scheduling engine.
//!
//! A periodic driver lists enabled searches and arms a jittered one-shot
//! timer per search; fired timers push jobs onto a bounded queue drained by
//! a fixed worker pool. Executions of the same search id are serialized by
//! the active-search guard; different searches run in parallel up to the
//! pool size. Failures are isolated to the failing search's cycle and
//! trigger one jittered retry re-enqueue outside the normal cadence.

mod ingest;
mod timers;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::dedup::DeduplicationEngine;
use crate::domain::SearchExecution;
use crate::error::{Error, Result, SchedulerError};
use crate::port::{MarketplaceClient, SearchPage, SearchQuery, Store};
use crate::resilience::ResilientClient;
use crate::shutdown::Shutdown;
use timers::TimerArena;

/// What put a job on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Periodic,
    Manual,
    Retry,
}

#[derive(Debug, Clone, Copy)]
struct Job {
    search_id: i64,
    trigger: Trigger,
}

/// The scheduling engine. Construct once, wrap in an `Arc`, and call
/// [`Scheduler::run`]; trigger on-demand executions with
/// [`Scheduler::trigger_search`].
pub struct Scheduler<C: MarketplaceClient + 'static> {
    store: Arc<dyn Store>,
    client: Arc<ResilientClient<C>>,
    dedup: Arc<DeduplicationEngine>,
    config: SchedulerConfig,
    active: Mutex<HashSet<i64>>,
    timers: TimerArena,
    tx: mpsc::Sender<Job>,
    rx: Mutex<Option<mpsc::Receiver<Job>>>,
    shutdown: Shutdown,
}

impl<C: MarketplaceClient + 'static> Scheduler<C> {
    pub fn new(
        store: Arc<dyn Store>,
        client: Arc<ResilientClient<C>>,
        dedup: Arc<DeduplicationEngine>,
        config: SchedulerConfig,
        shutdown: Shutdown,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_size);
        Self {
            store,
            client,
            dedup,
            timers: TimerArena::new(config.max_pending_timers),
            config,
            active: Mutex::new(HashSet::new()),
            tx,
            rx: Mutex::new(Some(rx)),
            shutdown,
        }
    }

    /// Run the worker pool and the periodic driver until shutdown.
    ///
    /// Workers finish their current unit of work before exiting and are
    /// joined before this returns.
    pub async fn run(self: Arc<Self>) {
        let Some(rx) = self.rx.lock().take() else {
            warn!("scheduler already running");
            return;
        };
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for worker_id in 0..self.config.worker_count {
            workers.push(tokio::spawn(Self::worker_loop(
                self.clone(),
                rx.clone(),
                worker_id,
            )));
        }
        info!(workers = self.config.worker_count, "scheduler started");

        // First periodic pass lands one full interval after startup; callers
        // wanting an immediate pass invoke run_cycle themselves.
        let period = self.config.cycle_interval();
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => self.run_cycle().await,
                _ = self.shutdown.cancelled() => break,
            }
        }

        info!("scheduler stopping");
        self.timers.abort_all();
        for worker in workers {
            let _ = worker.await;
        }
        info!("scheduler stopped");
    }

    /// One periodic pass: list enabled searches and arm a jittered timer for
    /// each that is not currently executing.
    pub async fn run_cycle(&self) {
        let searches = match self.store.list_enabled_searches().await {
            Ok(searches) => searches,
            Err(err) => {
                warn!(error = %err, "failed to list searches, skipping cycle");
                return;
            }
        };
        debug!(count = searches.len(), "periodic scheduling cycle");

        for search in searches {
            if self.is_active(search.id) {
                debug!(search_id = search.id, "search still executing, skipping");
                continue;
            }
            let delay = self.jittered_delay();
            self.arm_timer(search.id, delay, Trigger::Periodic);
        }
    }

    /// Immediately enqueue a search, bypassing the periodic delay.
    ///
    /// Fails with a typed error when the search does not exist, is disabled,
    /// is already executing, or the queue is full. An already-active search
    /// stays in the periodic cycle; only the manual trigger is rejected.
    pub async fn trigger_search(&self, search_id: i64) -> Result<()> {
        let search = self.store.get_search(search_id).await.map_err(|err| {
            if matches!(err, Error::NotFound { .. }) {
                SchedulerError::SearchNotFound { id: search_id }.into()
            } else {
                err
            }
        })?;

        if !search.enabled {
            return Err(SchedulerError::SearchDisabled { id: search_id }.into());
        }
        if self.is_active(search_id) {
            return Err(SchedulerError::SearchAlreadyActive { id: search_id }.into());
        }

        self.tx
            .try_send(Job {
                search_id,
                trigger: Trigger::Manual,
            })
            .map_err(|_| SchedulerError::QueueFull)?;
        info!(search_id, "manual trigger enqueued");
        Ok(())
    }

    /// True while the search is executing.
    pub fn is_active(&self, search_id: i64) -> bool {
        self.active.lock().contains(&search_id)
    }

    /// Number of pending (armed) timers. Observability only.
    pub fn pending_timer_count(&self) -> usize {
        self.timers.len()
    }

    fn begin(&self, search_id: i64) -> bool {
        self.active.lock().insert(search_id)
    }

    fn finish(&self, search_id: i64) {
        self.active.lock().remove(&search_id);
    }

    /// Base delay plus uniform jitter, plus a small human-like extra when
    /// humanize is on.
    fn jittered_delay(&self) -> Duration {
        let mut rng = rand::thread_rng();
        let jitter_ms =
            rng.gen_range(self.config.min_jitter_secs * 1_000..=self.config.max_jitter_secs * 1_000);
        let human_ms = if self.config.humanize {
            rng.gen_range(0..=2_000)
        } else {
            0
        };
        self.config.base_delay() + Duration::from_millis(jitter_ms + human_ms)
    }

    /// Arm a one-shot timer that pushes the search onto the queue.
    fn arm_timer(&self, search_id: i64, delay: Duration, trigger: Trigger) {
        let tx = self.tx.clone();
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if tx.send(Job { search_id, trigger }).await.is_err() {
                        debug!(search_id, "queue closed, dropping job");
                    }
                }
                _ = shutdown.cancelled() => {}
            }
        });
        self.timers.register(search_id, handle);
    }

    /// Arm the out-of-cycle retry re-enqueue after a failed execution.
    fn schedule_retry(&self, search_id: i64) {
        let jitter_ms =
            rand::thread_rng().gen_range(0..=self.config.requeue_jitter_secs * 1_000);
        let delay = Duration::from_secs(self.config.requeue_delay_secs)
            + Duration::from_millis(jitter_ms);
        info!(
            search_id,
            delay_ms = delay.as_millis() as u64,
            "scheduling retry re-enqueue"
        );
        self.arm_timer(search_id, delay, Trigger::Retry);
    }

    async fn worker_loop(
        this: Arc<Self>,
        rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
        worker_id: usize,
    ) {
        debug!(worker_id, "worker started");
        loop {
            let job = {
                let mut rx = rx.lock().await;
                tokio::select! {
                    job = rx.recv() => job,
                    _ = this.shutdown.cancelled() => None,
                }
            };
            let Some(job) = job else { break };
            this.process_job(job).await;
        }
        debug!(worker_id, "worker stopped");
    }

    async fn process_job(&self, job: Job) {
        if !self.begin(job.search_id) {
            debug!(search_id = job.search_id, "search already executing, dropping job");
            return;
        }
        let outcome = self.execute_search(job.search_id).await;
        self.finish(job.search_id);

        if let Err(err) = outcome {
            if err.is_cancelled() {
                return;
            }
            warn!(search_id = job.search_id, error = %err, "search execution failed");
            // A vanished search has nothing left to retry.
            if matches!(err, Error::NotFound { .. }) {
                return;
            }
            if job.trigger != Trigger::Retry {
                self.schedule_retry(job.search_id);
            } else {
                debug!(
                    search_id = job.search_id,
                    "retry execution failed, waiting for next cycle"
                );
            }
        }
    }

    /// Run one search end to end: attempts with linear backoff, result
    /// ingest, and the execution audit row.
    async fn execute_search(&self, search_id: i64) -> Result<()> {
        let search = self.store.get_search(search_id).await?;
        let mut execution = SearchExecution::started(search.id);
        if let Err(err) = self.store.record_execution(&execution).await {
            warn!(search_id, error = %err, "failed to record execution start");
        }

        let started = Instant::now();
        let query = SearchQuery::for_search(&search, self.config.page_size);

        match self.attempt_search(&query).await {
            Ok(page) => {
                let found = page.listings.len() as i64;
                match self.ingest_results(&search, page).await {
                    Ok(new_items) => {
                        execution.complete(found, new_items, started.elapsed().as_millis() as i64);
                        if let Err(err) = self.store.record_execution(&execution).await {
                            warn!(search_id, error = %err, "failed to record execution result");
                        }
                        info!(
                            search_id,
                            items_found = found,
                            new_items,
                            duration_ms = execution.duration_ms.unwrap_or_default(),
                            "search execution completed"
                        );
                        Ok(())
                    }
                    Err(err) => {
                        execution.fail(err.to_string(), started.elapsed().as_millis() as i64);
                        if let Err(record_err) = self.store.record_execution(&execution).await {
                            warn!(search_id, error = %record_err, "failed to record execution result");
                        }
                        Err(err)
                    }
                }
            }
            Err(err) => {
                execution.fail(err.to_string(), started.elapsed().as_millis() as i64);
                if let Err(record_err) = self.store.record_execution(&execution).await {
                    warn!(search_id, error = %record_err, "failed to record execution result");
                }
                Err(err)
            }
        }
    }

    /// Up to `max_retries + 1` attempts, each bounded by the execution
    /// timeout, with a linearly growing capped sleep in between.
    async fn attempt_search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let max_attempts = self.config.max_retries + 1;
        let mut attempt: u32 = 0;
        loop {
            // Shutdown aborts the in-flight attempt rather than waiting out
            // the execution timeout.
            let result = tokio::select! {
                result = tokio::time::timeout(
                    self.config.execution_timeout(),
                    self.client.search(query, &self.shutdown),
                ) => result,
                _ = self.shutdown.cancelled() => {
                    return Err(crate::error::ResilienceError::Cancelled.into());
                }
            };

            let err = match result {
                Ok(Ok(page)) => return Ok(page),
                Ok(Err(err)) if err.is_cancelled() => return Err(err),
                Ok(Err(err)) => err,
                Err(_) => Error::Timeout(self.config.execution_timeout()),
            };

            attempt += 1;
            if attempt >= max_attempts {
                return Err(err);
            }

            let delay = (self.config.attempt_delay() * attempt).min(self.config.attempt_delay_cap());
            debug!(
                query = %query.query,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, sleeping before next"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.cancelled() => {
                    return Err(crate::error::ResilienceError::Cancelled.into());
                }
            }
        }
    }
}
