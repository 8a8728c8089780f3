use std::sync::Arc;

use chrono::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::persister::{process_job, PersisterOutcome};

/// Fixed-size pool of workers sharing one job-id queue. Each worker
/// dequeues an id, runs a persister, logs the outcome, and loops —
/// mirrors `skynet-scheduler`'s split between a dispatching loop and
/// worker tasks, generalized to N consumers on one channel. The store is
/// the only resource shared between workers; each worker opens its own
/// sessions against it rather than sharing a connection.
pub struct WorkerPool {
    tx: mpsc::UnboundedSender<i64>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(worker_count: usize, db_path: Arc<str>, marker_threshold: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<i64>();
        let rx = Arc::new(AsyncMutex::new(rx));

        let handles = (0..worker_count)
            .map(|worker_id| {
                let rx = rx.clone();
                let db_path = db_path.clone();
                tokio::spawn(async move {
                    loop {
                        let job_id = {
                            let mut rx = rx.lock().await;
                            rx.recv().await
                        };
                        let Some(job_id) = job_id else {
                            debug!(worker_id, "queue closed, draining");
                            break;
                        };

                        match process_job(&db_path, job_id, marker_threshold) {
                            Ok(PersisterOutcome::Processed) => {
                                debug!(worker_id, job_id, "job processed");
                            }
                            Ok(PersisterOutcome::AlreadyClaimed) => {}
                            Err(e) if e.is_recoverable() => {
                                debug!(worker_id, job_id, error = %e, "lost claim race");
                            }
                            Err(e) => {
                                error!(worker_id, job_id, error = %e, "job failed");
                            }
                        }
                    }
                })
            })
            .collect();

        Self { tx, handles }
    }

    /// Enqueue a job id. Non-blocking: the queue is unbounded.
    pub fn put(&self, job_id: i64) {
        if self.tx.send(job_id).is_err() {
            warn!(job_id, "worker pool queue closed, job dropped");
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<i64> {
        self.tx.clone()
    }

    /// Close the queue and wait for every worker to drain and exit.
    pub async fn stop(self) {
        drop(self.tx);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
