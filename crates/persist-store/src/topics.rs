use persist_core::Topic;
use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Resolve a chat session to the root topic id of its chat's tree.
///
/// Mirrors `TopicDataManager.get_root_topic_id`: `ChatSession -> Chat -> Topic`.
pub fn root_topic_id(conn: &Connection, chat_session_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT chat.topic_id
         FROM chat_session
         JOIN chat ON chat.id = chat_session.chat_id
         WHERE chat_session.id = ?1",
        [chat_session_id],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            StoreError::NotFound(format!("chat session {chat_session_id}"))
        }
        other => StoreError::Database(other),
    })
}

/// Load every topic in rank order for the chat that owns `root_topic_id`.
pub fn load_topics_by_rank(conn: &Connection, root_topic_id: i64) -> Result<Vec<Topic>> {
    let chat_id: i64 = conn.query_row(
        "SELECT chat_id FROM topic WHERE id = ?1",
        [root_topic_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT id, parent_id, rank, level, title, description
         FROM topic
         WHERE chat_id = ?1
         ORDER BY rank ASC",
    )?;
    let rows = stmt.query_map([chat_id], |row| {
        Ok(Topic {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            rank: row.get(2)?,
            level: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}
