use rusqlite::Connection;

use crate::error::Result;

/// List the distinct participant user ids for a chat session.
pub fn participants(conn: &Connection, chat_session_id: i64) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT user_id FROM chat_user WHERE chat_session_id = ?1")?;
    let rows = stmt.query_map([chat_session_id], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Title of the chat's root topic — used to detect tutorial chats.
pub fn root_topic_title(conn: &Connection, chat_session_id: i64) -> Result<String> {
    let root_id = crate::topics::root_topic_id(conn, chat_session_id)?;
    Ok(conn.query_row(
        "SELECT title FROM topic WHERE id = ?1",
        [root_id],
        |row| row.get(0),
    )?)
}

/// Current count of highlight sessions this user has for any chat — used
/// as the new row's `rank`.
pub fn highlight_count_for_user(conn: &Connection, user_id: i64) -> Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM chat_highlight_session WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

/// Insert a highlight-bookmark row. Returns `Ok(false)` instead of erroring
/// when the `(chat_session_id, user_id)` uniqueness constraint is violated:
/// a race with user-initiated action is not fatal.
pub fn insert_highlight(
    conn: &Connection,
    chat_session_id: i64,
    user_id: i64,
    rank: u32,
) -> Result<bool> {
    match conn.execute(
        "INSERT INTO chat_highlight_session (chat_session_id, user_id, rank)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![chat_session_id, user_id, rank],
    ) {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
