//! `persist-interpreter` — turns a chat session's raw message log into
//! durable entities: chat minutes, speaking markers, and highlight tags.
//!
//! [`dispatcher::Dispatcher`] is the entry point: feed it messages in
//! timestamp order via `process`, then call `finalize` once the log is
//! exhausted.

pub mod dispatcher;
pub mod marker;
pub mod message;
pub mod minute;
pub mod tag;

pub use dispatcher::{Dispatcher, PersistableModels};
pub use message::{decode_message, encode_message};
