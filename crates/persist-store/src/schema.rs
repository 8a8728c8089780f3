use rusqlite::Connection;

use crate::error::Result;

/// Initialise the full persistence-service schema in `conn`.
///
/// All statements are idempotent (`CREATE TABLE IF NOT EXISTS`) so this can
/// run once per opened connection without tracking migrations — mirrors
/// `skynet-scheduler::db::init_db`.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- consumed tables ---------------------------------------------------
        CREATE TABLE IF NOT EXISTS chat_message_format_type (
            id      INTEGER NOT NULL PRIMARY KEY,
            name    TEXT    NOT NULL UNIQUE
        ) STRICT;

        CREATE TABLE IF NOT EXISTS chat (
            id          INTEGER NOT NULL PRIMARY KEY,
            topic_id    INTEGER NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS chat_session (
            id          INTEGER NOT NULL PRIMARY KEY,
            chat_id     INTEGER NOT NULL REFERENCES chat(id)
        ) STRICT;

        CREATE TABLE IF NOT EXISTS chat_user (
            id                  INTEGER NOT NULL PRIMARY KEY,
            chat_session_id     INTEGER NOT NULL REFERENCES chat_session(id),
            user_id             INTEGER NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS topic (
            id              INTEGER NOT NULL PRIMARY KEY,
            chat_id         INTEGER NOT NULL REFERENCES chat(id),
            parent_id       INTEGER,
            rank            INTEGER NOT NULL,
            level           INTEGER NOT NULL,
            title           TEXT    NOT NULL,
            description     TEXT    NOT NULL DEFAULT ''
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_topic_chat_rank ON topic (chat_id, rank);

        CREATE TABLE IF NOT EXISTS chat_message (
            id                      INTEGER NOT NULL PRIMARY KEY,
            chat_session_id         INTEGER NOT NULL REFERENCES chat_session(id),
            timestamp               TEXT    NOT NULL,
            format_type_id          INTEGER NOT NULL REFERENCES chat_message_format_type(id),
            payload_base64          TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_chat_message_session_ts
            ON chat_message (chat_session_id, timestamp);

        CREATE TABLE IF NOT EXISTS chat_persist_job (
            id                  INTEGER NOT NULL PRIMARY KEY,
            chat_session_id     INTEGER NOT NULL REFERENCES chat_session(id),
            created             TEXT    NOT NULL,
            owner               TEXT,
            start               TEXT,
            end                 TEXT,
            successful          INTEGER
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_chat_persist_job_unclaimed
            ON chat_persist_job (owner, start);

        -- produced tables -----------------------------------------------------
        CREATE TABLE IF NOT EXISTS chat_minute (
            chat_session_id     INTEGER NOT NULL REFERENCES chat_session(id),
            topic_id            INTEGER NOT NULL REFERENCES topic(id),
            start               TEXT,
            end                 TEXT,
            PRIMARY KEY (chat_session_id, topic_id)
        ) STRICT;

        CREATE TABLE IF NOT EXISTS chat_speaking_marker (
            id                      INTEGER NOT NULL PRIMARY KEY,
            chat_session_id         INTEGER NOT NULL REFERENCES chat_session(id),
            user_id                 INTEGER NOT NULL,
            chat_minute_topic_id    INTEGER NOT NULL,
            start                   TEXT    NOT NULL,
            end                     TEXT    NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS chat_tag (
            id                      INTEGER NOT NULL PRIMARY KEY,
            chat_session_id         INTEGER NOT NULL REFERENCES chat_session(id),
            user_id                 INTEGER NOT NULL,
            chat_minute_topic_id    INTEGER NOT NULL,
            tag_ref_id              TEXT    NOT NULL,
            name                    TEXT    NOT NULL,
            deleted                 INTEGER NOT NULL DEFAULT 0
        ) STRICT;

        CREATE TABLE IF NOT EXISTS chat_archive_job (
            id                      INTEGER NOT NULL PRIMARY KEY,
            chat_session_id         INTEGER NOT NULL REFERENCES chat_session(id),
            created                 TEXT    NOT NULL,
            not_before              TEXT    NOT NULL,
            retries_remaining       INTEGER NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS chat_highlight_session (
            id                      INTEGER NOT NULL PRIMARY KEY,
            chat_session_id         INTEGER NOT NULL REFERENCES chat_session(id),
            user_id                 INTEGER NOT NULL,
            rank                    INTEGER NOT NULL,
            UNIQUE (chat_session_id, user_id)
        ) STRICT;

        INSERT OR IGNORE INTO chat_message_format_type (id, name)
            VALUES (1, 'thrift-binary-base64');
        ",
    )?;
    Ok(())
}
