//! Background loop delivering profile batches on a fixed interval.

use super::profile_batcher::{DeliveryReport, ProfileEventBatcher, ProfileSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub struct ProfileFlusher {
    batcher: Arc<ProfileEventBatcher>,
    sink: Arc<dyn ProfileSink>,
    shutdown_notify: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for ProfileFlusher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileFlusher")
            .field("pending_events", &self.batcher.pending_events())
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

impl ProfileFlusher {
    /// Start delivering every `interval`; must be called within a tokio runtime
    pub fn spawn(
        batcher: Arc<ProfileEventBatcher>,
        sink: Arc<dyn ProfileSink>,
        interval: Duration,
    ) -> Self {
        let shutdown_notify = Arc::new(Notify::new());
        let interval = interval.max(Duration::from_millis(1));

        let handle = {
            let batcher = Arc::clone(&batcher);
            let sink = Arc::clone(&sink);
            let shutdown_notify = Arc::clone(&shutdown_notify);
            tokio::spawn(async move {
                info!(interval_ms = interval.as_millis() as u64, "Profile flusher started");
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {
                            batcher.deliver(sink.as_ref()).await;
                        }
                        _ = shutdown_notify.notified() => {
                            info!("Profile flusher shutting down");
                            break;
                        }
                    }
                }
            })
        };

        Self {
            batcher,
            sink,
            shutdown_notify,
            handle,
        }
    }

    /// Stop the loop and deliver whatever is still buffered
    pub async fn shutdown(self) -> DeliveryReport {
        self.shutdown_notify.notify_one();
        if let Err(e) = self.handle.await {
            error!(error = %e, "Profile flusher task failed");
        }
        self.batcher.deliver(self.sink.as_ref()).await
    }
}
