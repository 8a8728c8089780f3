use std::sync::Arc;
use std::time::Duration as StdDuration;

use rusqlite::Connection;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Poll loop discovering unclaimed jobs and enqueueing them onto the worker
/// pool's queue. Grounded on `SchedulerEngine::run`'s
/// `tokio::select!`-over-`interval`/`watch` shape, generalized from a fixed
/// one-second tick to a configurable poll period, and from firing jobs
/// directly to handing off ids for a separate pool to claim.
///
/// Claim races across instances are resolved at the store (the conditional
/// UPDATE in `persist_store::jobs::claim`), so discovery may legitimately
/// enqueue jobs another instance has already taken. Each poll opens its own
/// short-lived session rather than holding a connection across ticks.
pub struct JobMonitor {
    db_path: Arc<str>,
    pool_tx: mpsc::UnboundedSender<i64>,
    poll_interval: StdDuration,
}

impl JobMonitor {
    pub fn new(db_path: Arc<str>, pool_tx: mpsc::UnboundedSender<i64>, poll_interval: StdDuration) -> Self {
        Self {
            db_path,
            pool_tx,
            poll_interval,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("job monitor started");
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.poll_once() {
                        error!(error = %e, "job monitor poll failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("job monitor shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn poll_once(&self) -> persist_store::Result<()> {
        let ids = {
            let conn = Connection::open(&*self.db_path)?;
            persist_store::jobs::list_unclaimed(&conn)?
        };
        debug!(count = ids.len(), "discovered unclaimed jobs");
        for id in ids {
            if self.pool_tx.send(id).is_err() {
                break; // pool is gone, nothing left to do
            }
        }
        Ok(())
    }
}
