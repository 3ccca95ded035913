//! Process-wide shutdown signal.
//!
//! A single [`ShutdownSignal`] is broadcast to every background loop through
//! cheap [`Shutdown`] handles. Loops poll [`Shutdown::is_cancelled`] or await
//! [`Shutdown::cancelled`] inside `select!` so sleeps and retry waits abort
//! promptly while in-flight work runs to completion.

use tokio::sync::watch;

/// Sending half of the shutdown broadcast.
#[derive(Debug)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    /// Broadcast shutdown to every handle.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving handle cloned into each background loop.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// True once shutdown has been triggered.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when shutdown is triggered or the signal is dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
        // Sender dropped without triggering; treat as shutdown.
    }

    /// A handle that never fires, for callers without a lifecycle.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Leak the sender so the channel stays open for the process lifetime.
        std::mem::forget(tx);
        Self { rx }
    }
}

/// Create a connected signal/handle pair.
pub fn channel() -> (ShutdownSignal, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSignal { tx }, Shutdown { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_wakes_waiters() {
        let (signal, shutdown) = channel();
        assert!(!shutdown.is_cancelled());

        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.cancelled().await })
        };
        signal.trigger();
        waiter.await.unwrap();
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_after_trigger() {
        let (signal, shutdown) = channel();
        signal.trigger();
        shutdown.cancelled().await;
    }
}
