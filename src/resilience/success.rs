//! Per-identity success tracking.
//!
//! Keeps an exponential moving average of request outcomes per client
//! identity. Rates live only for the process lifetime; they are never
//! persisted.

use std::collections::HashMap;

use parking_lot::Mutex;

/// EMA smoothing factor: `rate = α·outcome + (1-α)·rate`.
const ALPHA: f64 = 0.2;

/// Rate assumed for an identity before any observation.
const INITIAL_RATE: f64 = 1.0;

struct TrackerState {
    rates: HashMap<i64, f64>,
    /// Insertion order, for deterministic tie-breaking.
    order: Vec<i64>,
}

/// Tracks a success-rate EMA per identity id.
pub struct SuccessTracker {
    state: Mutex<TrackerState>,
}

impl Default for SuccessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SuccessTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                rates: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Fold one request outcome into the identity's EMA.
    pub fn record(&self, identity_id: i64, success: bool) {
        let outcome = if success { 1.0 } else { 0.0 };
        let mut state = self.state.lock();
        if !state.rates.contains_key(&identity_id) {
            state.order.push(identity_id);
        }
        let rate = state.rates.entry(identity_id).or_insert(INITIAL_RATE);
        *rate = ALPHA * outcome + (1.0 - ALPHA) * *rate;
    }

    /// Current rate for an identity; unseen identities report 1.0.
    pub fn rate(&self, identity_id: i64) -> f64 {
        self.state
            .lock()
            .rates
            .get(&identity_id)
            .copied()
            .unwrap_or(INITIAL_RATE)
    }

    /// A copy of the full rate map, never the live map.
    pub fn snapshot(&self) -> HashMap<i64, f64> {
        self.state.lock().rates.clone()
    }

    /// The identity with the highest rate at or above `min_rate`.
    ///
    /// Ties break in first-seen order. `None` means no tracked identity
    /// qualifies and the caller should fall back to a random pick.
    pub fn best_identity(&self, min_rate: f64) -> Option<i64> {
        let state = self.state.lock();
        let mut best: Option<(i64, f64)> = None;
        for &id in &state.order {
            let rate = state.rates[&id];
            if rate < min_rate {
                continue;
            }
            match best {
                Some((_, best_rate)) if rate <= best_rate => {}
                _ => best = Some((id, rate)),
            }
        }
        best.map(|(id, _)| id)
    }
}
