use chrono::Duration;
use persist_core::{ChatMessage, ChatMinute, ChatTag, MarkerKind, MessageBody, Result, SpeakingMarker};
use persist_topics::TopicCollection;
use tracing::warn;

use crate::marker::MarkerHandler;
use crate::minute::MinuteHandler;
use crate::tag::TagHandler;

/// Everything a job needs to persist once a chat session's message log has
/// been fully interpreted.
#[derive(Debug, Clone, Default)]
pub struct PersistableModels {
    pub minutes: Vec<ChatMinute>,
    pub markers: Vec<SpeakingMarker>,
    pub tags: Vec<ChatTag>,
}

/// Routes each decoded message to its sub-handler, in construction order
/// minute -> marker -> tag (so the active-minute state the marker and tag
/// handlers read is always the minute handler's, never stale).
pub struct Dispatcher<'a> {
    minute: MinuteHandler<'a>,
    marker: MarkerHandler,
    tag: TagHandler,
}

impl<'a> Dispatcher<'a> {
    pub fn initialize(chat_session_id: i64, topics: &'a TopicCollection, marker_threshold: Duration) -> Self {
        Self {
            minute: MinuteHandler::initialize(chat_session_id, topics),
            marker: MarkerHandler::initialize(marker_threshold),
            tag: TagHandler::initialize(),
        }
    }

    /// Process one message. Hard failures abort the whole job; soft failures
    /// are logged and the message is dropped.
    pub fn process(&mut self, message: &ChatMessage) -> Result<()> {
        let active_minute = self.minute.active_minute();

        let outcome = match &message.body {
            MessageBody::Benign => Ok(()),
            MessageBody::MinuteCreate { topic_id } => {
                self.minute.create_models(*topic_id, message.timestamp)
            }
            MessageBody::MinuteUpdate { topic_id } => {
                self.minute.update_models(*topic_id, message.timestamp)
            }
            MessageBody::MarkerCreate {
                user_id,
                marker_kind,
                is_speaking,
            } => {
                if *marker_kind != MarkerKind::Speaking {
                    Ok(())
                } else {
                    self.marker
                        .process(*user_id, *is_speaking, message.timestamp, active_minute)
                }
            }
            MessageBody::TagCreate { tag_id, user_id, name } => self.tag.process_create(
                tag_id,
                *user_id,
                name,
                message.timestamp,
                active_minute,
            ),
            MessageBody::TagDelete { tag_id } => self.tag.process_delete(tag_id, active_minute),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(e) if e.is_soft() => {
                warn!(message_id = message.id, error = %e, "dropping message");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn finalize(self) -> Result<PersistableModels> {
        Ok(PersistableModels {
            minutes: self.minute.finalize()?,
            markers: self.marker.finalize(),
            tags: self.tag.finalize(),
        })
    }
}
