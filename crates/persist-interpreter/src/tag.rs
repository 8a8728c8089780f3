use std::collections::HashMap;

use chrono::{DateTime, Utc};
use persist_core::{ChatTag, PersistError, Result};

struct TagRecord {
    created_at: DateTime<Utc>,
    // None when the tag id was seen but rejected (duplicate user+name within
    // the minute); present and possibly `deleted` once persisted.
    entity: Option<ChatTag>,
}

/// Tracks highlight-bookmark tags across a chat, keyed by the tag ids
/// clients mint. Grounded on `topic_data_manager.py`'s tag bookkeeping: every
/// tag id is remembered once seen (`all_tags`), and live tags are additionally
/// indexed per minute (`tags_to_persist`) to reject duplicate
/// (user, name) pairs within the same minute and to support delete.
pub struct TagHandler {
    all_tags: HashMap<String, TagRecord>,
    tags_to_persist: HashMap<i64, HashMap<String, (i64, String)>>,
}

impl TagHandler {
    pub fn initialize() -> Self {
        Self {
            all_tags: HashMap::new(),
            tags_to_persist: HashMap::new(),
        }
    }

    pub fn process_create(
        &mut self,
        tag_id: &str,
        user_id: i64,
        name: &str,
        timestamp: DateTime<Utc>,
        active_minute: Option<i64>,
    ) -> Result<()> {
        if self.all_tags.contains_key(tag_id) {
            return Err(PersistError::DuplicateTagId {
                tag_id: tag_id.to_string(),
            });
        }
        let minute = active_minute.ok_or(PersistError::NoActiveChatMinute)?;

        let minute_map = self.tags_to_persist.entry(minute).or_default();
        let duplicate_triple = minute_map.values().any(|(u, n)| *u == user_id && n == name);

        if duplicate_triple {
            self.all_tags.insert(
                tag_id.to_string(),
                TagRecord {
                    created_at: timestamp,
                    entity: None,
                },
            );
            return Ok(());
        }

        minute_map.insert(tag_id.to_string(), (user_id, name.to_string()));
        self.all_tags.insert(
            tag_id.to_string(),
            TagRecord {
                created_at: timestamp,
                entity: Some(ChatTag {
                    user_id,
                    chat_minute_topic_id: minute,
                    tag_ref_id: tag_id.to_string(),
                    name: name.to_string(),
                    deleted: false,
                }),
            },
        );
        Ok(())
    }

    pub fn process_delete(&mut self, tag_id: &str, active_minute: Option<i64>) -> Result<()> {
        active_minute.ok_or(PersistError::NoActiveChatMinute)?;

        let minute_topic_id = {
            let record = self
                .all_tags
                .get(tag_id)
                .ok_or_else(|| PersistError::TagIdDoesNotExist {
                    tag_id: tag_id.to_string(),
                })?;
            match &record.entity {
                Some(e) if !e.deleted => e.chat_minute_topic_id,
                _ => return Ok(()), // rejected at create, or already deleted
            }
        };

        if let Some(minute_map) = self.tags_to_persist.get_mut(&minute_topic_id) {
            if minute_map.remove(tag_id).is_some() {
                if let Some(record) = self.all_tags.get_mut(tag_id) {
                    if let Some(entity) = &mut record.entity {
                        entity.deleted = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// Surviving tags (created and never deleted), ordered by create
    /// timestamp.
    pub fn finalize(self) -> Vec<ChatTag> {
        let mut survivors: Vec<(DateTime<Utc>, ChatTag)> = self
            .tags_to_persist
            .values()
            .flat_map(|m| m.keys())
            .filter_map(|tag_id| self.all_tags.get(tag_id))
            .filter_map(|record| record.entity.clone().map(|e| (record.created_at, e)))
            .collect();
        survivors.sort_by_key(|(ts, _)| *ts);
        survivors.into_iter().map(|(_, e)| e).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn create_then_delete_leaves_no_survivor() {
        let mut h = TagHandler::initialize();
        h.process_create("t1", 1, "important", ts(1), Some(10)).unwrap();
        h.process_delete("t1", Some(10)).unwrap();
        assert!(h.finalize().is_empty());
    }

    #[test]
    fn surviving_tags_sorted_by_creation_order() {
        let mut h = TagHandler::initialize();
        h.process_create("t2", 1, "b", ts(5), Some(10)).unwrap();
        h.process_create("t1", 1, "a", ts(1), Some(10)).unwrap();
        let tags = h.finalize();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].tag_ref_id, "t1");
        assert_eq!(tags[1].tag_ref_id, "t2");
    }

    #[test]
    fn duplicate_tag_id_is_hard_failure() {
        let mut h = TagHandler::initialize();
        h.process_create("t1", 1, "a", ts(1), Some(10)).unwrap();
        let err = h.process_create("t1", 2, "b", ts(2), Some(10)).unwrap_err();
        assert!(matches!(err, PersistError::DuplicateTagId { .. }));
    }

    #[test]
    fn duplicate_user_name_within_minute_is_silently_rejected() {
        let mut h = TagHandler::initialize();
        h.process_create("t1", 1, "a", ts(1), Some(10)).unwrap();
        h.process_create("t2", 1, "a", ts(2), Some(10)).unwrap();
        let tags = h.finalize();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag_ref_id, "t1");
    }

    #[test]
    fn delete_unknown_tag_is_hard_failure() {
        let mut h = TagHandler::initialize();
        let err = h.process_delete("nope", Some(10)).unwrap_err();
        assert!(matches!(err, PersistError::TagIdDoesNotExist { .. }));
    }

    #[test]
    fn double_delete_is_silently_ignored() {
        let mut h = TagHandler::initialize();
        h.process_create("t1", 1, "a", ts(1), Some(10)).unwrap();
        h.process_delete("t1", Some(10)).unwrap();
        h.process_delete("t1", Some(10)).unwrap();
        assert!(h.finalize().is_empty());
    }
}
