use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use persist_core::{PersistError, Result, SpeakingMarker};

#[derive(Debug, Clone, Copy)]
struct OpenSpan {
    start: DateTime<Utc>,
    chat_minute_topic_id: i64,
}

/// Pairs per-user speaking-start/speaking-end events into [`SpeakingMarker`]
/// entities, dropping pairs shorter than the configured threshold.
///
/// A speaking marker is bound to the minute active at speaking-*start*, per
/// `original_source/persistsvc/message_handler.py`'s `_on_marker_create`.
pub struct MarkerHandler {
    threshold: Duration,
    open: HashMap<i64, OpenSpan>,
    emitted: Vec<SpeakingMarker>,
}

impl MarkerHandler {
    pub fn initialize(threshold: Duration) -> Self {
        Self {
            threshold,
            open: HashMap::new(),
            emitted: Vec::new(),
        }
    }

    /// Process one speaking marker-create. `active_minute` is the minute
    /// active right now, per the minute handler.
    pub fn process(
        &mut self,
        user_id: i64,
        is_speaking: bool,
        timestamp: DateTime<Utc>,
        active_minute: Option<i64>,
    ) -> Result<()> {
        if is_speaking {
            if self.open.contains_key(&user_id) {
                return Ok(()); // duplicate speaking-start, ignore
            }
            let chat_minute_topic_id = active_minute.ok_or(PersistError::NoActiveChatMinute)?;
            self.open.insert(
                user_id,
                OpenSpan {
                    start: timestamp,
                    chat_minute_topic_id,
                },
            );
            return Ok(());
        }

        let Some(span) = self.open.remove(&user_id) else {
            return Ok(()); // speaking-end with no open span, ignore
        };

        if timestamp - span.start > self.threshold {
            self.emitted.push(SpeakingMarker {
                user_id,
                chat_minute_topic_id: span.chat_minute_topic_id,
                start: span.start,
                end: timestamp,
            });
        }

        Ok(())
    }

    pub fn finalize(mut self) -> Vec<SpeakingMarker> {
        self.emitted.sort_by_key(|m| m.start);
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn pair_above_threshold_emits_one_marker() {
        let mut h = MarkerHandler::initialize(Duration::zero());
        h.process(7, true, ts(100), Some(1)).unwrap();
        h.process(7, false, ts(105), Some(1)).unwrap();
        let markers = h.finalize();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].user_id, 7);
        assert_eq!(markers[0].chat_minute_topic_id, 1);
        assert_eq!(markers[0].start, ts(100));
        assert_eq!(markers[0].end, ts(105));
    }

    #[test]
    fn pair_at_or_below_threshold_is_dropped() {
        let mut h = MarkerHandler::initialize(Duration::seconds(10));
        h.process(7, true, ts(100), Some(1)).unwrap();
        h.process(7, false, ts(105), Some(1)).unwrap();
        assert!(h.finalize().is_empty());
    }

    #[test]
    fn speaking_start_without_active_minute_fails() {
        let mut h = MarkerHandler::initialize(Duration::zero());
        let err = h.process(7, true, ts(1), None).unwrap_err();
        assert!(matches!(err, PersistError::NoActiveChatMinute));
    }

    #[test]
    fn duplicate_start_and_unmatched_end_are_ignored() {
        let mut h = MarkerHandler::initialize(Duration::zero());
        h.process(7, true, ts(1), Some(1)).unwrap();
        h.process(7, true, ts(2), Some(1)).unwrap(); // duplicate start
        h.process(9, false, ts(3), Some(1)).unwrap(); // unmatched end
        h.process(7, false, ts(10), Some(1)).unwrap();
        let markers = h.finalize();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].start, ts(1));
    }
}
