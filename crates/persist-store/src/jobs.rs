use chrono::{DateTime, Utc};
use persist_core::PersistJob;
use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Conditionally claim job `id`: set owner/start iff both are still NULL.
///
/// Returns `true` iff this call won the race (one row affected).
pub fn claim(conn: &Connection, id: i64, owner: &str, now: DateTime<Utc>) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE chat_persist_job
         SET owner = ?1, start = ?2
         WHERE id = ?3 AND owner IS NULL AND start IS NULL",
        rusqlite::params![owner, now.to_rfc3339(), id],
    )?;
    Ok(rows == 1)
}

/// Mark the job finished: `end = now`, `successful = true`.
pub fn finish(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE chat_persist_job SET end = ?1, successful = 1 WHERE id = ?2",
        rusqlite::params![now.to_rfc3339(), id],
    )?;
    Ok(())
}

/// Mark the job aborted: `successful = false`, leaving `owner`/`start` set
/// so re-processing is an explicit administrative act.
pub fn abort(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE chat_persist_job SET successful = 0 WHERE id = ?1",
        [id],
    )?;
    Ok(())
}

/// Read the chat session id a job is for.
pub fn chat_session_id_for_job(conn: &Connection, id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT chat_session_id FROM chat_persist_job WHERE id = ?1",
        [id],
        |row| row.get(0),
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(format!("persist job {id}")),
        other => StoreError::Database(other),
    })
}

/// List every unclaimed job id (owner IS NULL AND start IS NULL).
pub fn list_unclaimed(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT id FROM chat_persist_job WHERE owner IS NULL AND start IS NULL")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Insert a fresh, unclaimed job row (test/ingestion helper).
pub fn insert_job(conn: &Connection, id: i64, chat_session_id: i64, created: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "INSERT INTO chat_persist_job (id, chat_session_id, created, owner, start, end, successful)
         VALUES (?1, ?2, ?3, NULL, NULL, NULL, NULL)",
        rusqlite::params![id, chat_session_id, created.to_rfc3339()],
    )?;
    Ok(())
}

/// Read the full job row back (test helper / observability).
pub fn get_job(conn: &Connection, id: i64) -> Result<PersistJob> {
    conn.query_row(
        "SELECT id, chat_session_id, created, owner, start, end, successful
         FROM chat_persist_job WHERE id = ?1",
        [id],
        |row| {
            let successful: Option<i64> = row.get(6)?;
            Ok(PersistJob {
                id: row.get(0)?,
                chat_session_id: row.get(1)?,
                created: parse_dt(row.get::<_, String>(2)?),
                owner: row.get(3)?,
                start: row.get::<_, Option<String>>(4)?.map(parse_dt),
                end: row.get::<_, Option<String>>(5)?.map(parse_dt),
                successful: successful.map(|v| v != 0),
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(format!("persist job {id}")),
        other => StoreError::Database(other),
    })
}

fn parse_dt(s: String) -> DateTime<Utc> {
    s.parse().unwrap_or_else(|_| Utc::now())
}
