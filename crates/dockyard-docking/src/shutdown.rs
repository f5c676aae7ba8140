//! Batch-wide cancellation signal.

use tokio::sync::watch;

/// Trigger side, held by whoever may cancel the batch (e.g. a Ctrl-C handler).
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

/// Listener side, cloned into every worker.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (ShutdownHandle, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownHandle { tx }, Shutdown { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Shutdown {
        let (_handle, shutdown) = Self::new();
        shutdown
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the batch is cancelled. Pends forever if the handle is
    /// dropped without triggering.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_listeners() {
        let (handle, mut shutdown) = Shutdown::new();
        let mut other = handle.subscribe();
        assert!(!shutdown.is_triggered());

        handle.trigger();

        shutdown.triggered().await;
        other.triggered().await;
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_never_stays_pending() {
        let mut shutdown = Shutdown::never();
        let res = tokio::time::timeout(Duration::from_millis(20), shutdown.triggered()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let (handle, mut shutdown) = Shutdown::new();
        drop(handle);
        let res = tokio::time::timeout(Duration::from_millis(20), shutdown.triggered()).await;
        assert!(res.is_err());
        assert!(!shutdown.is_triggered());
    }
}
