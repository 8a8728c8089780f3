use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity this process claims jobs under. A per-process constant, not a global.
pub const SERVICE_IDENTITY: &str = "persistsvc";

/// A unit of work: "process this chat session into derived entities."
///
/// Unclaimed iff `owner` and `start` are both `None`. Once both are set, no
/// other worker may touch the row. `end`/`successful` are set exactly once,
/// after every model write for the job is durable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistJob {
    pub id: i64,
    pub chat_session_id: i64,
    pub created: DateTime<Utc>,
    pub owner: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub successful: Option<bool>,
}

impl PersistJob {
    pub fn is_unclaimed(&self) -> bool {
        self.owner.is_none() && self.start.is_none()
    }
}

/// A topic node in a chat's discussion outline.
///
/// `rank` is a contiguous, 0-based pre-order index over the whole chat;
/// `level` is tree depth (root = 1). A topic is a leaf iff no other topic
/// names it as parent — that fact lives in [`crate::topic::TopicCollection`],
/// not on the struct itself, since it depends on the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub rank: u32,
    pub level: u32,
    pub title: String,
    pub description: String,
}

/// Decoded chat message type tags. `join`/`leave`/`whiteboard-*`/`start`/
/// `end` carry no payload the interpreter needs and are represented purely
/// by the [`ChatMessage`] header — [`MessageBody::Benign`] below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageBody {
    Benign,
    MinuteCreate { topic_id: i64 },
    MinuteUpdate { topic_id: i64 },
    MarkerCreate {
        user_id: i64,
        marker_kind: MarkerKind,
        is_speaking: bool,
    },
    TagCreate {
        tag_id: String,
        user_id: i64,
        name: String,
    },
    TagDelete { tag_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    Speaking,
    Other,
}

/// A decoded chat message, ready for the dispatcher. Messages must be
/// presented to the dispatcher in ascending `timestamp` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_session_id: i64,
    pub timestamp: DateTime<Utc>,
    pub body: MessageBody,
}

/// The time interval during which a given topic was active.
///
/// Created with `start = None, end = None`; both must be set by the time
/// [`crate::topic::TopicCollection`]-driven handlers finalize, or the job fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMinute {
    pub chat_session_id: i64,
    pub topic_id: i64,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// A matched speaking-start/speaking-end pair for one user, bound to the
/// chat minute that was active when speaking started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakingMarker {
    pub user_id: i64,
    pub chat_minute_topic_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A surviving tag: created and not later deleted within the same minute,
/// de-duplicated by (minute, user, name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTag {
    pub user_id: i64,
    pub chat_minute_topic_id: i64,
    pub tag_ref_id: String,
    pub name: String,
    pub deleted: bool,
}

/// Follow-up archival work scheduled once a chat session has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatArchiveJob {
    pub chat_session_id: i64,
    pub created: DateTime<Utc>,
    pub not_before: DateTime<Utc>,
    pub retries_remaining: u32,
}

impl ChatArchiveJob {
    pub const DEFAULT_RETRIES: u32 = 3;
    pub const DELAY_MINUTES: i64 = 5;

    pub fn new(chat_session_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            chat_session_id,
            created: now,
            not_before: now + chrono::Duration::minutes(Self::DELAY_MINUTES),
            retries_remaining: Self::DEFAULT_RETRIES,
        }
    }
}

/// A per-participant highlight bookmark into a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHighlightSession {
    pub chat_session_id: i64,
    pub user_id: i64,
    pub rank: u32,
}

/// The title that marks a chat's root topic as a tutorial chat, which is
/// excluded from highlight-bookmark creation.
pub const TUTORIAL_ROOT_TITLE: &str = "Tutorial";
