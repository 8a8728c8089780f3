//! `persist-core` — shared data model and error taxonomy for the chat
//! persistence pipeline.
//!
//! This crate has no I/O: it defines the entities every other crate in the
//! workspace reads, writes, or derives (`PersistJob`, `Topic`, `ChatMessage`,
//! `ChatMinute`, `SpeakingMarker`, `ChatTag`, `ChatArchiveJob`,
//! `ChatHighlightSession`) and the [`error::PersistError`] taxonomy that
//! classifies failures as soft (drop the message, keep going), hard (abort
//! the job), or recoverable (exit this worker cycle cleanly).

pub mod error;
pub mod types;

pub use error::{Classification, PersistError, Result};
pub use types::*;
