//! Bounded arena of pending one-shot execution timers.
//!
//! Each armed timer is a spawned task that pushes a search onto the work
//! queue when it fires. The arena caps memory under sustained scheduling
//! pressure: beyond capacity the oldest pending timers are cancelled and
//! evicted, so those searches simply miss that cycle.

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

struct PendingTimer {
    search_id: i64,
    armed_at: Instant,
    handle: JoinHandle<()>,
}

/// FIFO arena of cancellable pending timers.
pub(crate) struct TimerArena {
    timers: Mutex<VecDeque<PendingTimer>>,
    capacity: usize,
}

impl TimerArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            timers: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Track a newly armed timer, evicting the oldest beyond capacity.
    pub fn register(&self, search_id: i64, handle: JoinHandle<()>) {
        let mut timers = self.timers.lock();
        timers.retain(|t| !t.handle.is_finished());
        timers.push_back(PendingTimer {
            search_id,
            armed_at: Instant::now(),
            handle,
        });
        while timers.len() > self.capacity {
            if let Some(evicted) = timers.pop_front() {
                evicted.handle.abort();
                debug!(
                    search_id = evicted.search_id,
                    age_ms = evicted.armed_at.elapsed().as_millis() as u64,
                    "pending timer cap reached, evicted oldest"
                );
            }
        }
    }

    /// Number of tracked timers, fired or not.
    pub fn len(&self) -> usize {
        self.timers.lock().len()
    }

    /// Cancel every pending timer. Used on shutdown.
    pub fn abort_all(&self) {
        let mut timers = self.timers.lock();
        for timer in timers.drain(..) {
            timer.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn eviction_keeps_arena_at_capacity() {
        let arena = TimerArena::new(3);
        for id in 0..10 {
            let handle = tokio::spawn(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
            arena.register(id, handle);
            assert!(arena.len() <= 3);
        }
        assert_eq!(arena.len(), 3);
        arena.abort_all();
        assert_eq!(arena.len(), 0);
    }

    #[tokio::test]
    async fn finished_timers_are_pruned_on_register() {
        let arena = TimerArena::new(10);
        let done = tokio::spawn(async {});
        done.await.ok();
        // Re-spawn a finished handle stand-in plus a live one.
        arena.register(1, tokio::spawn(async {}));
        tokio::time::sleep(Duration::from_millis(10)).await;
        arena.register(
            2,
            tokio::spawn(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }),
        );
        assert_eq!(arena.len(), 1);
        arena.abort_all();
    }
}
