use std::collections::HashMap;

use chrono::{DateTime, Utc};
use persist_core::{ChatMinute, PersistError, Result};
use persist_topics::TopicCollection;

/// Derives start/end timestamps for every topic's chat minute from a stream
/// of minute-create (leaf only) and minute-update (final leaf only) events,
/// and tracks which minute is "active" for the marker/tag handlers.
///
/// Construction precomputes the end-topic chain for every highest-ranked
/// leaf: the ordered list of ancestors whose minute closes the instant that
/// leaf's does. See `compute_end_chains` for the derivation.
pub struct MinuteHandler<'a> {
    chat_session_id: i64,
    topics: &'a TopicCollection,
    minutes: HashMap<i64, ChatMinute>,
    end_chains: HashMap<i64, Vec<i64>>,
    active_minute_topic_id: Option<i64>,
}

impl<'a> MinuteHandler<'a> {
    pub fn initialize(chat_session_id: i64, topics: &'a TopicCollection) -> Self {
        let minutes = topics
            .as_list_by_rank()
            .iter()
            .map(|t| {
                (
                    t.id,
                    ChatMinute {
                        chat_session_id,
                        topic_id: t.id,
                        start: None,
                        end: None,
                    },
                )
            })
            .collect();

        Self {
            chat_session_id,
            topics,
            minutes,
            end_chains: compute_end_chains(topics),
            active_minute_topic_id: None,
        }
    }

    pub fn active_minute(&self) -> Option<i64> {
        self.active_minute_topic_id
    }

    /// Process a minute-create event. Leaf-only; unknown topics are a hard
    /// failure, non-leaf topics are silently ignored.
    pub fn create_models(&mut self, topic_id: i64, timestamp: DateTime<Utc>) -> Result<()> {
        let topic = self
            .topics
            .get(topic_id)
            .ok_or(PersistError::TopicIdDoesNotExist {
                chat_session_id: self.chat_session_id,
                topic_id,
            })?
            .clone();

        if !self.topics.is_leaf(&topic) {
            return Ok(());
        }

        // 1. Start this leaf's minute and make it active.
        self.minutes.get_mut(&topic_id).unwrap().start = Some(timestamp);
        self.active_minute_topic_id = Some(topic_id);

        // 2. Walk the parent chain, starting any ancestor not yet started.
        let mut parent_id = topic.parent_id;
        while let Some(pid) = parent_id {
            let minute = self.minutes.get_mut(&pid).unwrap();
            if minute.start.is_some() {
                break;
            }
            minute.start = Some(timestamp);
            parent_id = self.topics.get(pid).and_then(|t| t.parent_id);
        }

        // 3. Close the previous leaf (and its end-topic chain), if any.
        if let Some(prev_leaf) = self.topics.previous_leaf_by_id(topic_id) {
            let prev_id = prev_leaf.id;
            self.minutes.get_mut(&prev_id).unwrap().end = Some(timestamp);
            if let Some(chain) = self.end_chains.get(&prev_id) {
                for ancestor_id in chain {
                    self.minutes.get_mut(ancestor_id).unwrap().end = Some(timestamp);
                }
            }
        }

        Ok(())
    }

    /// Process a minute-update event. Valid only for the final leaf (no
    /// `next_topic`); other topics are silently ignored, same as a
    /// minute-create for a non-leaf topic.
    pub fn update_models(&mut self, topic_id: i64, timestamp: DateTime<Utc>) -> Result<()> {
        self.topics
            .get(topic_id)
            .ok_or(PersistError::TopicIdDoesNotExist {
                chat_session_id: self.chat_session_id,
                topic_id,
            })?;

        if self.topics.next_by_id(topic_id).is_some() {
            return Ok(());
        }

        self.minutes.get_mut(&topic_id).unwrap().end = Some(timestamp);
        if let Some(chain) = self.end_chains.get(&topic_id) {
            for ancestor_id in chain {
                self.minutes.get_mut(ancestor_id).unwrap().end = Some(timestamp);
            }
        }

        // Catch any message arriving between this minute's close and the
        // next one's open.
        self.active_minute_topic_id = None;
        Ok(())
    }

    /// Collect all minutes in rank order. Fails the whole job if any minute
    /// was never fully opened and closed.
    pub fn finalize(self) -> Result<Vec<ChatMinute>> {
        self.topics
            .as_list_by_rank()
            .iter()
            .map(|t| {
                let minute = self.minutes.get(&t.id).unwrap();
                if minute.start.is_none() || minute.end.is_none() {
                    Err(PersistError::InvalidChatMinute {
                        topic_id: t.id,
                        has_start: minute.start.is_some(),
                        has_end: minute.end.is_some(),
                    })
                } else {
                    Ok(minute.clone())
                }
            })
            .collect()
    }
}

/// For each highest-ranked leaf (the last child before ascending out of its
/// subtree, or the last topic overall), compute the ordered list of
/// ancestors whose minute-end fires at the same instant as the leaf's.
///
/// Walking backwards in rank order from the leaf, a topic is appended (and
/// `current_closing_level` decremented) when it is a non-leaf strictly
/// shallower than the running closing level; the walk stops as soon as it
/// reaches a topic shallower than `level_to_close` (the level of the next
/// topic after `L`, or the root level if `L` is last), without processing
/// that topic.
fn compute_end_chains(topics: &TopicCollection) -> HashMap<i64, Vec<i64>> {
    let mut chains = HashMap::new();

    for leaf in topics.leaf_list_by_rank() {
        let next = topics.next_by_id(leaf.id);
        let is_highest_ranked = match next {
            None => true,
            Some(n) => n.level < leaf.level,
        };
        if !is_highest_ranked {
            continue;
        }

        let level_to_close = next.map(|n| n.level).unwrap_or(1);
        let mut chain = Vec::new();
        let mut current_closing_level = leaf.level;
        let mut cursor = topics.previous_by_id(leaf.id);

        while let Some(t) = cursor {
            if t.level < level_to_close {
                break;
            }
            if !topics.is_leaf(t) && t.level < current_closing_level {
                chain.push(t.id);
                current_closing_level -= 1;
            }
            cursor = topics.previous_by_id(t.id);
        }

        chains.insert(leaf.id, chain);
    }

    chains
}

#[cfg(test)]
mod tests {
    use super::*;
    use persist_core::Topic;

    fn topic(id: i64, parent: Option<i64>, rank: u32, level: u32) -> Topic {
        Topic {
            id,
            parent_id: parent,
            rank,
            level,
            title: format!("t{id}"),
            description: String::new(),
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    // Root(0,lvl1)/T1(1,lvl2,leaf)/T2(2,lvl2)/T3(3,lvl3)/T4(4,lvl4,leaf)/
    // T5(5,lvl3,leaf)/T6(6,lvl2,leaf)
    fn sample_tree() -> TopicCollection {
        TopicCollection::new(vec![
            topic(0, None, 0, 1),
            topic(1, Some(0), 1, 2),
            topic(2, Some(0), 2, 2),
            topic(3, Some(2), 3, 3),
            topic(4, Some(3), 4, 4),
            topic(5, Some(2), 5, 3),
            topic(6, Some(0), 6, 2),
        ])
    }

    #[test]
    fn end_topic_chains_match_worked_example() {
        let topics = sample_tree();
        let chains = compute_end_chains(&topics);
        assert_eq!(chains.get(&4), Some(&vec![3]));
        assert_eq!(chains.get(&5), Some(&vec![2]));
        assert_eq!(chains.get(&6), Some(&vec![0]));
        assert_eq!(chains.len(), 3);
    }

    #[test]
    fn deep_tree_end_topic_chains() {
        // Root0/T1(leaf)/T2/T3/T4(leaf)/T5(leaf)/T6/T7/T8(leaf)/T9/T10(leaf)
        let topics = TopicCollection::new(vec![
            topic(0, None, 0, 1),
            topic(1, Some(0), 1, 2),
            topic(2, Some(0), 2, 2),
            topic(3, Some(2), 3, 3),
            topic(4, Some(3), 4, 4),
            topic(5, Some(2), 5, 3),
            topic(6, Some(2), 6, 3),
            topic(7, Some(6), 7, 4),
            topic(8, Some(7), 8, 5),
            topic(9, Some(0), 9, 2),
            topic(10, Some(9), 10, 3),
        ]);
        let chains = compute_end_chains(&topics);
        assert_eq!(chains.get(&4), Some(&vec![3]));
        assert_eq!(chains.get(&8), Some(&vec![7, 6, 2]));
        assert_eq!(chains.get(&10), Some(&vec![9, 0]));
    }

    #[test]
    fn single_topic_chat_finalizes_closed() {
        let topics = TopicCollection::new(vec![topic(0, None, 0, 1), topic(1, Some(0), 1, 2)]);
        let mut h = MinuteHandler::initialize(1, &topics);
        h.create_models(1, ts(1345643927)).unwrap();
        h.update_models(1, ts(1345643963)).unwrap();
        let minutes = h.finalize().unwrap();
        assert_eq!(minutes.len(), 2);
        for m in &minutes {
            assert_eq!(m.start, Some(ts(1345643927)));
            assert_eq!(m.end, Some(ts(1345643963)));
        }
    }

    #[test]
    fn unclosed_minute_fails_finalize() {
        let topics = TopicCollection::new(vec![topic(0, None, 0, 1), topic(1, Some(0), 1, 2)]);
        let mut h = MinuteHandler::initialize(1, &topics);
        h.create_models(1, ts(100)).unwrap();
        let err = h.finalize().unwrap_err();
        assert!(matches!(err, PersistError::InvalidChatMinute { .. }));
    }

    #[test]
    fn unknown_topic_is_hard_failure() {
        let topics = TopicCollection::new(vec![topic(0, None, 0, 1)]);
        let mut h = MinuteHandler::initialize(1, &topics);
        let err = h.create_models(99, ts(1)).unwrap_err();
        assert!(matches!(err, PersistError::TopicIdDoesNotExist { .. }));
    }

    #[test]
    fn non_leaf_minute_create_is_ignored() {
        let topics = sample_tree();
        let mut h = MinuteHandler::initialize(1, &topics);
        h.create_models(2, ts(1)).unwrap();
        assert!(h.active_minute().is_none());
    }
}
