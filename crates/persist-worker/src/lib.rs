//! `persist-worker` — the job coordinator: claims persist jobs, runs each
//! through the interpreter pipeline, and commits the result.
//!
//! [`monitor::JobMonitor`] discovers unclaimed jobs and hands their ids to
//! [`pool::WorkerPool`], whose workers run [`persister::process_job`].

pub mod monitor;
pub mod persister;
pub mod pool;

pub use monitor::JobMonitor;
pub use persister::{process_job, PersisterOutcome};
pub use pool::WorkerPool;
