//! Scheduling engine configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

fn default_worker_count() -> usize {
    num_cpus::get().min(4)
}

/// Configuration for the periodic search scheduler.
///
/// Missing fields fall back to [`Default`], so partial sections parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of worker tasks draining the execution queue.
    pub worker_count: usize,
    /// Capacity of the bounded execution queue.
    pub queue_size: usize,
    /// How often the periodic driver lists enabled searches, in seconds.
    pub cycle_interval_secs: u64,
    /// Base delay before an enqueued search fires, in seconds.
    pub base_delay_secs: u64,
    /// Lower bound of the uniform delay jitter, in seconds.
    pub min_jitter_secs: u64,
    /// Upper bound of the uniform delay jitter, in seconds.
    pub max_jitter_secs: u64,
    /// Whether to add an extra human-like random delay on top of the jitter.
    pub humanize: bool,
    /// Maximum number of pending one-shot timers; oldest are evicted beyond it.
    pub max_pending_timers: usize,
    /// Retries per execution after the initial attempt.
    pub max_retries: u32,
    /// Base sleep between attempts, grows linearly per attempt, in seconds.
    pub attempt_delay_secs: u64,
    /// Cap on the between-attempt sleep, in seconds.
    pub attempt_delay_cap_secs: u64,
    /// Wall-clock timeout for a single execution attempt, in seconds.
    pub execution_timeout_secs: u64,
    /// Base delay before a failed search is re-enqueued, in seconds.
    pub requeue_delay_secs: u64,
    /// Uniform jitter added to the failure re-enqueue delay, in seconds.
    pub requeue_jitter_secs: u64,
    /// Results requested per search execution.
    pub page_size: u32,
}

impl SchedulerConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.base_delay_secs)
    }

    pub fn attempt_delay(&self) -> Duration {
        Duration::from_secs(self.attempt_delay_secs)
    }

    pub fn attempt_delay_cap(&self) -> Duration {
        Duration::from_secs(self.attempt_delay_cap_secs)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.worker_count",
                reason: "must be at least 1".into(),
            });
        }
        if self.queue_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.queue_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.page_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.min_jitter_secs > self.max_jitter_secs {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.min_jitter_secs",
                reason: format!(
                    "{} exceeds max_jitter_secs {}",
                    self.min_jitter_secs, self.max_jitter_secs
                ),
            });
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_size: 64,
            cycle_interval_secs: 300,
            base_delay_secs: 5,
            min_jitter_secs: 1,
            max_jitter_secs: 30,
            humanize: true,
            max_pending_timers: 100,
            max_retries: 2,
            attempt_delay_secs: 5,
            attempt_delay_cap_secs: 60,
            execution_timeout_secs: 120,
            requeue_delay_secs: 60,
            requeue_jitter_secs: 120,
            page_size: 50,
        }
    }
}
