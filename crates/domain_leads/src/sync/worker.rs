//! Background sync worker
//!
//! A single cooperative loop per process: wake on a fixed interval, run one
//! engine batch, log the outcome, go back to sleep. The next wake is
//! scheduled unconditionally; a failed or partial batch changes nothing
//! about the cadence. There is no inter-process coordination; the store's
//! atomic claim is the serialization point if two workers ever overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::engine::SyncEngine;

/// Spawns and owns the background sync loop
pub struct SyncWorker;

impl SyncWorker {
    /// Spawns the worker task
    ///
    /// The first tick fires immediately, draining anything queued while the
    /// process was down; subsequent ticks follow `interval`.
    ///
    /// # Arguments
    ///
    /// * `engine` - The sync engine to invoke on each tick
    /// * `interval` - Delay between invocations
    ///
    /// # Returns
    ///
    /// A handle for graceful shutdown
    pub fn spawn(engine: Arc<SyncEngine>, interval: Duration) -> SyncWorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Sync worker started");

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match engine.process_pending_syncs().await {
                            Ok(report) => {
                                debug!(
                                    scanned = report.scanned,
                                    synced = report.synced,
                                    failed = report.failed,
                                    skipped = report.skipped,
                                    "Scheduled sync run finished"
                                );
                            }
                            Err(error) => {
                                // The loop never dies on a bad run; the next
                                // tick retries naturally.
                                warn!(%error, "Scheduled sync run aborted");
                            }
                        }
                    }
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Sync worker stopped");
        });

        SyncWorkerHandle {
            shutdown_tx,
            handle,
        }
    }
}

/// Handle to a running sync worker
pub struct SyncWorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SyncWorkerHandle {
    /// Signals the worker to stop and waits for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }

    /// Aborts the worker without waiting (test/teardown helper)
    pub fn abort(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::{NewContact, SyncStatus};
    use crate::ports::mock::{MockLeadStore, ScriptedCrm};
    use crate::ports::LeadStorePort;
    use crate::sync::engine::SyncSettings;

    fn contact_payload() -> NewContact {
        NewContact {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "1234567890".to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn worker_drains_queue_and_shuts_down() {
        let store = Arc::new(MockLeadStore::new());
        let crm = Arc::new(ScriptedCrm::always_succeeds());
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            crm,
            SyncSettings::default(),
        ));

        let contact = store.create_contact(contact_payload()).await.unwrap();

        let worker = SyncWorker::spawn(engine, Duration::from_millis(20));

        // Give the immediate first tick time to run.
        tokio::time::sleep(Duration::from_millis(100)).await;
        worker.shutdown().await;

        let synced = store.get_contact(contact.id).await.unwrap();
        assert_eq!(synced.sync.status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn worker_keeps_ticking_after_failed_runs() {
        let store = Arc::new(MockLeadStore::new());
        let crm = Arc::new(ScriptedCrm::always_fails("down"));
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            crm.clone(),
            SyncSettings {
                batch_size: 10,
                max_attempts: 100,
            },
        ));

        store.create_contact(contact_payload()).await.unwrap();

        let worker = SyncWorker::spawn(engine, Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;
        worker.shutdown().await;

        // Several ticks happened despite every attempt failing.
        assert!(crm.call_count() >= 2);
    }
}
