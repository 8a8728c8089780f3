use rusqlite::Connection;
use tracing::debug;

use crate::collection::TopicCollection;

/// Read a chat session's topic tree from the store and build a
/// [`TopicCollection`]. Grounded on
/// `TopicDataManager.get_collection`/`get_root_topic_id`.
pub fn load(conn: &Connection, chat_session_id: i64) -> persist_store::Result<TopicCollection> {
    let root_id = persist_store::topics::root_topic_id(conn, chat_session_id)?;
    let topics = persist_store::topics::load_topics_by_rank(conn, root_id)?;
    debug!(chat_session_id, root_id, count = topics.len(), "loaded topic tree");
    Ok(TopicCollection::new(topics))
}
