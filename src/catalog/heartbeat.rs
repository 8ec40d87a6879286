use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::catalog::{CatalogResult, RemoteCatalog};

/// Handle to the background heartbeat of a [`RemoteCatalog`].
///
/// The heartbeat runs as a periodic task watched over by a supervisor task, which
/// spawns a fresh periodic task whenever the previous one fails or panics. Dropping
/// the handle (or calling [`HeartbeatHandle::shutdown`]) stops both.
#[derive(Debug)]
pub struct HeartbeatHandle {
    shutdown: watch::Sender<bool>,
    supervisor: JoinHandle<()>,
    restarts: Arc<AtomicU64>,
}

impl HeartbeatHandle {
    pub(crate) fn spawn(catalog: Arc<RemoteCatalog>, interval: Duration) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let restarts = Arc::new(AtomicU64::new(0));

        info!("Starting catalog heartbeat every {interval:?}");
        let supervisor =
            tokio::spawn(supervise(catalog, interval, shutdown_rx, restarts.clone()));

        Self {
            shutdown,
            supervisor,
            restarts,
        }
    }

    /// How many times the heartbeat task had to be restarted after a failure.
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.supervisor.is_finished()
    }

    /// Stop the heartbeat and wait for the supervisor to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.supervisor.await;
    }
}

// Equivalent of a fixed-delay schedule: the first run happens one interval after
// the start, and any error ends the task.
async fn heartbeat_task(catalog: Arc<RemoteCatalog>, interval: Duration) -> CatalogResult<()> {
    loop {
        tokio::time::sleep(interval).await;
        catalog.heartbeat().await?;
    }
}

async fn supervise(
    catalog: Arc<RemoteCatalog>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    restarts: Arc<AtomicU64>,
) {
    loop {
        let mut task = tokio::spawn(heartbeat_task(catalog.clone(), interval));

        tokio::select! {
            result = &mut task => {
                match result {
                    Ok(Err(e)) => warn!("Catalog heartbeat failed, restarting it: {e}"),
                    Err(e) if e.is_panic() => {
                        warn!("Catalog heartbeat panicked, restarting it: {e}")
                    }
                    // Cancelled from the outside
                    Err(_) | Ok(Ok(())) => return,
                }
                restarts.fetch_add(1, Ordering::Relaxed);
            }
            _ = shutdown.changed() => {
                task.abort();
                info!("Catalog heartbeat stopped");
                return;
            }
        }
    }
}
