// ── Settings writer ──
//
// Persistence runs off the main context. Snapshots are queued to a single
// task that hands each write to the blocking pool in submission order, so
// a slow disk never stalls cell updates and later snapshots always land
// last.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::model::{DeviceId, DeviceSettings};
use crate::store::DeviceRecordStore;

enum WriteJob {
    Save(DeviceSettings),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background writer for one device.
#[derive(Clone)]
pub(crate) struct SettingsWriter {
    tx: mpsc::UnboundedSender<WriteJob>,
}

impl SettingsWriter {
    /// Spawn the writer task. It exits once every handle is dropped.
    pub(crate) fn spawn(device: DeviceId, store: Arc<dyn DeviceRecordStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match job {
                    WriteJob::Save(settings) => {
                        let store = Arc::clone(&store);
                        let id = device.clone();
                        let written =
                            tokio::task::spawn_blocking(move || store.save_settings(&id, &settings))
                                .await;
                        match written {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                warn!(device = %device, error = %e, "failed to persist device settings");
                            }
                            Err(e) => warn!(device = %device, error = %e, "settings write panicked"),
                        }
                    }
                    WriteJob::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!(device = %device, "settings writer stopped");
        });

        Self { tx }
    }

    /// Queue a snapshot for writing.
    pub(crate) fn save(&self, settings: DeviceSettings) {
        if self.tx.send(WriteJob::Save(settings)).is_err() {
            warn!("settings writer is gone, snapshot dropped");
        }
    }

    /// Wait until every snapshot queued so far has been written.
    pub(crate) async fn flush(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteJob::Flush(done_tx)).is_err() {
            return false;
        }
        done_rx.await.is_ok()
    }
}
