//! Cooperative shutdown for the units of one process.
//!
//! A single flag, flipped once, observed by every blocking operation. Waiters
//! are woken through the watch channel, so a unit parked on an empty queue
//! sees the flag instead of sleeping forever.

use std::sync::Arc;
use tokio::sync::watch;

/// Owner side of the shutdown flag. Cloning shares the same flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Create a signal in the running state.
    pub fn new() -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Token handed to units and blocking operations.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            shutdown_rx: self.shutdown_tx.subscribe(),
        }
    }

    /// Stop the process and wake every waiter. Idempotent.
    pub fn trigger(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// True once `trigger` has been called.
    pub fn is_triggered(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of the shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    shutdown_rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Resolve once the process is stopping.
    pub async fn cancelled(&self) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        loop {
            if *shutdown_rx.borrow_and_update() {
                return;
            }
            if shutdown_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// True once the process is stopping.
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown_rx.borrow()
    }
}
