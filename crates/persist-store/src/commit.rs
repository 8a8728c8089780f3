use persist_core::{ChatArchiveJob, ChatMinute, ChatTag, SpeakingMarker};
use rusqlite::Connection;

use crate::error::Result;

/// Stage the full persistable model set produced by `finalize()`.
///
/// All three inserts + the archive job happen inside the caller's
/// transaction: the full minute/marker/tag/archive-job set commits, or
/// none does.
pub fn insert_minutes(conn: &Connection, chat_session_id: i64, minutes: &[ChatMinute]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO chat_minute (chat_session_id, topic_id, start, end) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for m in minutes {
        stmt.execute(rusqlite::params![
            chat_session_id,
            m.topic_id,
            m.start.map(|d| d.to_rfc3339()),
            m.end.map(|d| d.to_rfc3339()),
        ])?;
    }
    Ok(())
}

pub fn insert_markers(conn: &Connection, chat_session_id: i64, markers: &[SpeakingMarker]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO chat_speaking_marker
            (chat_session_id, user_id, chat_minute_topic_id, start, end)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for m in markers {
        stmt.execute(rusqlite::params![
            chat_session_id,
            m.user_id,
            m.chat_minute_topic_id,
            m.start.to_rfc3339(),
            m.end.to_rfc3339(),
        ])?;
    }
    Ok(())
}

pub fn insert_tags(conn: &Connection, chat_session_id: i64, tags: &[ChatTag]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO chat_tag
            (chat_session_id, user_id, chat_minute_topic_id, tag_ref_id, name, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for t in tags {
        stmt.execute(rusqlite::params![
            chat_session_id,
            t.user_id,
            t.chat_minute_topic_id,
            t.tag_ref_id,
            t.name,
            t.deleted as i64,
        ])?;
    }
    Ok(())
}

pub fn insert_archive_job(conn: &Connection, job: &ChatArchiveJob) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_archive_job (chat_session_id, created, not_before, retries_remaining)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            job.chat_session_id,
            job.created.to_rfc3339(),
            job.not_before.to_rfc3339(),
            job.retries_remaining,
        ],
    )?;
    Ok(())
}
