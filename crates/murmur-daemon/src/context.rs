//! Daemon-wide shared state.

use std::sync::Arc;

use tokio::sync::{broadcast, Notify};

use murmur_db::Store;

/// Handle passed to every task and command.
#[derive(Clone)]
pub struct DaemonContext {
    pub store: Arc<dyn Store>,
    /// Signalled whenever a message becomes readable. Waiters must re-check
    /// the store after waking and must not rely on catching every signal.
    pub new_messages: Arc<Notify>,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonContext {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            store,
            new_messages: Arc::new(Notify::new()),
            shutdown_tx,
        }
    }

    pub fn shutdown(&self) {
        // No receivers just means nothing is running yet.
        let _ = self.shutdown_tx.send(());
    }
}
