//! Human-like request cadence.
//!
//! Rotates through a small set of precomputed delay patterns and scales them
//! by an adaptive variance multiplier: failures slow the cadence down (up to
//! 5x), successes let it drift back toward normal.

use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;

use crate::config::TimingConfig;

/// Variance floor; normal cadence.
const MIN_VARIANCE: f64 = 1.0;
/// Variance ceiling after sustained failures.
const MAX_VARIANCE: f64 = 5.0;
/// Multiplicative decay toward the floor on success.
const DECAY: f64 = 0.9;
/// Multiplicative inflation toward the ceiling on failure.
const INFLATE: f64 = 1.5;
/// Randomized variants appended to the fixed patterns.
const EXTRA_PATTERNS: usize = 3;

struct TimingState {
    patterns: Vec<Duration>,
    index: usize,
    adaptive_variance: f64,
}

/// Generates human-like delays between outbound requests.
pub struct TimingManager {
    state: Mutex<TimingState>,
    config: TimingConfig,
}

impl TimingManager {
    pub fn new(config: TimingConfig) -> Self {
        let base = config.base_interval();
        let min_jitter = config.min_jitter();
        let max_jitter = config.max_jitter();

        let mut patterns = vec![
            base,
            base + min_jitter,
            base.saturating_sub(min_jitter),
            base + max_jitter,
            base.saturating_sub(max_jitter),
        ];
        let mut rng = rand::thread_rng();
        let spread = max_jitter.as_millis() as i64;
        for _ in 0..EXTRA_PATTERNS {
            let offset = if spread > 0 {
                rng.gen_range(-spread..=spread)
            } else {
                0
            };
            let ms = (base.as_millis() as i64 + offset).max(0) as u64;
            patterns.push(Duration::from_millis(ms));
        }

        Self {
            state: Mutex::new(TimingState {
                patterns,
                index: 0,
                adaptive_variance: MIN_VARIANCE,
            }),
            config,
        }
    }

    /// Next delay: current pattern scaled by the adaptive variance, plus an
    /// optional extra human-like jitter. Advances the pattern cursor.
    pub fn adaptive_delay(&self) -> Duration {
        let mut state = self.state.lock();
        let pattern = state.patterns[state.index];
        state.index = (state.index + 1) % state.patterns.len();

        let scaled = pattern.as_secs_f64() * state.adaptive_variance;
        drop(state);

        let human_jitter = if self.config.human_variation {
            let cap = self.config.min_jitter().as_millis() as u64;
            if cap > 0 {
                rand::thread_rng().gen_range(0..=cap)
            } else {
                0
            }
        } else {
            0
        };

        Duration::from_secs_f64(scaled) + Duration::from_millis(human_jitter)
    }

    /// Feed a request outcome back into the cadence.
    pub fn adjust_variance(&self, success: bool) {
        let mut state = self.state.lock();
        state.adaptive_variance = if success {
            (state.adaptive_variance * DECAY).max(MIN_VARIANCE)
        } else {
            (state.adaptive_variance * INFLATE).min(MAX_VARIANCE)
        };
    }

    /// Current variance multiplier. Observability only.
    pub fn variance(&self) -> f64 {
        self.state.lock().adaptive_variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(human_variation: bool) -> TimingManager {
        TimingManager::new(TimingConfig {
            base_interval_ms: 1_000,
            min_jitter_ms: 100,
            max_jitter_ms: 400,
            human_variation,
        })
    }

    #[test]
    fn variance_starts_at_floor() {
        assert_eq!(manager(false).variance(), 1.0);
    }

    #[test]
    fn failures_inflate_up_to_ceiling() {
        let m = manager(false);
        for _ in 0..20 {
            m.adjust_variance(false);
        }
        assert_eq!(m.variance(), 5.0);
    }

    #[test]
    fn successes_decay_back_to_floor() {
        let m = manager(false);
        m.adjust_variance(false);
        assert!(m.variance() > 1.0);
        for _ in 0..50 {
            m.adjust_variance(true);
        }
        assert_eq!(m.variance(), 1.0);
    }

    #[test]
    fn delays_rotate_through_patterns() {
        let m = manager(false);
        let count = m.state.lock().patterns.len();
        let first: Vec<_> = (0..count).map(|_| m.adaptive_delay()).collect();
        let second: Vec<_> = (0..count).map(|_| m.adaptive_delay()).collect();
        // Variance stayed at 1.0 and jitter is off, so the cycle repeats.
        assert_eq!(first, second);
    }

    #[test]
    fn failure_slows_the_next_delay() {
        let m = manager(false);
        let before = m.adaptive_delay();
        for _ in 0..5 {
            m.adjust_variance(false);
        }
        // Compare the same pattern slot one full rotation later.
        let count = m.state.lock().patterns.len();
        for _ in 0..count - 1 {
            m.adaptive_delay();
        }
        let after = m.adaptive_delay();
        assert!(after > before);
    }
}
