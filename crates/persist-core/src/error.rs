use thiserror::Error;

/// How the message dispatcher and persister should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Drop the offending message, log a warning, keep processing the job.
    Soft,
    /// Abort the whole job; roll back and mark it failed.
    Hard,
    /// Not a failure at all — exit this worker cycle cleanly, no job mutation.
    Recoverable,
}

/// Errors raised while interpreting a chat's message stream or coordinating
/// the job that drives it.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The claim update touched zero rows — another worker already owns the job.
    #[error("persist job {job_id} already claimed")]
    DuplicatePersistJob { job_id: i64 },

    /// A minute-create/minute-update message referenced a topic outside the chat's tree.
    #[error("topic {topic_id} does not exist in chat session {chat_session_id}")]
    TopicIdDoesNotExist { chat_session_id: i64, topic_id: i64 },

    /// finalize() found a chat minute whose start or end was never set.
    #[error("chat minute for topic {topic_id} was never closed (start={has_start}, end={has_end})")]
    InvalidChatMinute {
        topic_id: i64,
        has_start: bool,
        has_end: bool,
    },

    /// A marker or tag message arrived before any minute-create was accepted.
    #[error("no active chat minute")]
    NoActiveChatMinute,

    /// tag-create repeated an already-seen tag id.
    #[error("duplicate tag id {tag_id}")]
    DuplicateTagId { tag_id: String },

    /// tag-delete referenced an id never seen in a tag-create.
    #[error("tag id {tag_id} does not exist")]
    TagIdDoesNotExist { tag_id: String },

    /// Underlying store error (rusqlite) — always hard.
    #[error("store error: {0}")]
    Store(String),

    /// Decoding a message payload failed.
    #[error("failed to decode message payload: {0}")]
    Decode(String),
}

impl PersistError {
    pub fn classification(&self) -> Classification {
        match self {
            PersistError::DuplicatePersistJob { .. } => Classification::Recoverable,
            PersistError::TopicIdDoesNotExist { .. }
            | PersistError::InvalidChatMinute { .. }
            | PersistError::Store(_)
            | PersistError::Decode(_) => Classification::Hard,
            PersistError::NoActiveChatMinute
            | PersistError::DuplicateTagId { .. }
            | PersistError::TagIdDoesNotExist { .. } => Classification::Soft,
        }
    }

    pub fn is_hard(&self) -> bool {
        self.classification() == Classification::Hard
    }

    pub fn is_soft(&self) -> bool {
        self.classification() == Classification::Soft
    }

    pub fn is_recoverable(&self) -> bool {
        self.classification() == Classification::Recoverable
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
