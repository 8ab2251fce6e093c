//! Background sync loop.
//!
//! Syncs every `interval`, or as soon as a sync is requested through the
//! [`SyncHandle`]. Failed passes are logged and retried on the next wake-up.
//! Shutting down runs one last pass so pending edits are flushed.

use crate::remote::RemoteSync;
use crate::session::Session;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Handle to a running sync worker.
pub struct SyncHandle {
    trigger: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Ask for a sync pass as soon as possible.
    ///
    /// Requests made while a pass is running queue exactly one more pass.
    pub fn request(&self) {
        self.trigger.notify_one();
    }

    /// Stop the worker after a final pass and wait for it to exit.
    pub async fn shutdown(self) {
        info!("Stopping sync worker");
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Sync worker panicked: {}", e);
        }
    }
}

pub struct SyncWorker;

impl SyncWorker {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn<R: RemoteSync + 'static>(session: Arc<Session<R>>, interval: Duration) -> SyncHandle {
        let trigger = Arc::new(Notify::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(session, interval, trigger.clone(), shutdown_rx));

        SyncHandle {
            trigger,
            shutdown,
            task,
        }
    }
}

async fn run<R: RemoteSync + 'static>(
    session: Arc<Session<R>>,
    interval: Duration,
    trigger: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let stopping = tokio::select! {
            _ = shutdown.changed() => true,
            _ = trigger.notified() => {
                debug!("Sync requested");
                false
            }
            _ = tokio::time::sleep(interval) => {
                info!("Auto-syncing items...");
                false
            }
        };

        if let Err(e) = session.synchronize().await {
            error!("Sync failed: {}", e);
        }

        if stopping || *shutdown.borrow() {
            break;
        }
    }
    debug!("Sync worker exited");
}
