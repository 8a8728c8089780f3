//! `persist-store` — SQLite schema and queries backing the chat
//! persistence service.
//!
//! Thin, query-per-function modules mirroring `skynet-scheduler::db`'s
//! `init_db` + free-function query style, rather than a repository object —
//! every query here is a single-purpose prepared statement, and the caller
//! (`persist-worker`) owns transaction boundaries.

pub mod commit;
pub mod error;
pub mod highlights;
pub mod jobs;
pub mod messages;
pub mod schema;
pub mod topics;

pub use error::{Result, StoreError};
pub use schema::init_db;
