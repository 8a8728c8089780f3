use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::error::Result;

/// A chat message row as read from the store, before the tagged-union
/// payload has been decoded. Decoding is `persist-interpreter`'s job — this
/// crate only knows how to get bytes out of SQLite in timestamp order.
#[derive(Debug, Clone)]
pub struct RawChatMessage {
    pub id: i64,
    pub chat_session_id: i64,
    pub timestamp: DateTime<Utc>,
    pub payload_base64: String,
}

/// Load every `thrift-binary-base64` message for a chat session, strictly
/// ordered by timestamp ascending — the ordering the interpreter relies on.
pub fn load_messages(conn: &Connection, chat_session_id: i64) -> Result<Vec<RawChatMessage>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.chat_session_id, m.timestamp, m.payload_base64
         FROM chat_message m
         JOIN chat_message_format_type t ON t.id = m.format_type_id
         WHERE m.chat_session_id = ?1 AND t.name = 'thrift-binary-base64'
         ORDER BY m.timestamp ASC",
    )?;
    let rows = stmt.query_map([chat_session_id], |row| {
        let ts: String = row.get(2)?;
        Ok(RawChatMessage {
            id: row.get(0)?,
            chat_session_id: row.get(1)?,
            timestamp: ts
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
            payload_base64: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Insert a message (test/ingestion helper — the real chat service owns
/// message insertion in production; this workspace only consumes).
pub fn insert_message(
    conn: &Connection,
    id: i64,
    chat_session_id: i64,
    timestamp: DateTime<Utc>,
    payload_base64: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_message (id, chat_session_id, timestamp, format_type_id, payload_base64)
         VALUES (?1, ?2, ?3, 1, ?4)",
        rusqlite::params![id, chat_session_id, timestamp.to_rfc3339(), payload_base64],
    )?;
    Ok(())
}
