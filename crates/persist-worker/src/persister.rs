use chrono::Utc;
use persist_core::{ChatArchiveJob, PersistError, Result, SERVICE_IDENTITY, TUTORIAL_ROOT_TITLE};
use persist_interpreter::{decode_message, Dispatcher};
use rusqlite::Connection;
use tracing::warn;

/// What happened to a job this worker picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersisterOutcome {
    /// Processed to completion and committed.
    Processed,
    /// Lost the claim race to another worker; nothing was touched.
    AlreadyClaimed,
}

/// Open a short-lived session against the store. Callers hold the returned
/// connection only for the step at hand and let it drop on every exit path —
/// no session is held across the dispatcher's compute loop.
fn open(db_path: &str) -> Result<Connection> {
    Connection::open(db_path).map_err(|e| PersistError::Store(e.to_string()))
}

/// End-to-end lifecycle of one persist job: claim, load and decode the
/// chat's message log, run the dispatcher, commit models + archive job +
/// highlights, finish. Grounded on `original_source/persistsvc/persister.py`
/// and `persist.py`, including its `create_db_session()` calls at the start
/// of each step — each step here opens and drops its own connection rather
/// than sharing one across the job.
///
/// The highlight pass runs inside the same transaction as the rest of the
/// commit rather than a literal second store session: `insert_highlight`
/// already turns a uniqueness violation into `Ok(false)` instead of an
/// error, so a conflicting row never aborts the surrounding transaction —
/// the required isolation falls out of that without a second connection.
/// See DESIGN.md.
pub fn process_job(
    db_path: &str,
    job_id: i64,
    marker_threshold: chrono::Duration,
) -> Result<PersisterOutcome> {
    let now = Utc::now();
    let claimed = {
        let conn = open(db_path)?;
        persist_store::jobs::claim(&conn, job_id, SERVICE_IDENTITY, now)?
    };
    if !claimed {
        return Err(PersistError::DuplicatePersistJob { job_id });
    }

    match run(db_path, job_id, marker_threshold) {
        Ok(()) => Ok(PersisterOutcome::Processed),
        Err(e) => {
            let conn = open(db_path)?;
            if let Err(abort_err) = persist_store::jobs::abort(&conn, job_id) {
                warn!(job_id, error = %abort_err, "failed to mark job aborted");
            }
            Err(e)
        }
    }
}

fn run(db_path: &str, job_id: i64, marker_threshold: chrono::Duration) -> Result<()> {
    let chat_session_id = {
        let conn = open(db_path)?;
        persist_store::jobs::chat_session_id_for_job(&conn, job_id)?
    };

    let (minutes, markers, tags) = {
        let conn = open(db_path)?;
        let raw_messages = persist_store::messages::load_messages(&conn, chat_session_id)?;
        let topics = persist_topics::loader::load(&conn, chat_session_id)?;

        let messages = raw_messages
            .into_iter()
            .map(decode_message)
            .collect::<Result<Vec<_>>>()?;

        let mut dispatcher = Dispatcher::initialize(chat_session_id, &topics, marker_threshold);
        for message in &messages {
            dispatcher.process(message)?;
        }
        let models = dispatcher.finalize()?;
        (models.minutes, models.markers, models.tags)
    };

    let archive_job = ChatArchiveJob::new(chat_session_id, now_utc());

    let mut conn = open(db_path)?;
    let tx = conn
        .transaction()
        .map_err(|e| PersistError::Store(e.to_string()))?;

    persist_store::commit::insert_minutes(&tx, chat_session_id, &minutes)?;
    persist_store::commit::insert_markers(&tx, chat_session_id, &markers)?;
    persist_store::commit::insert_tags(&tx, chat_session_id, &tags)?;
    persist_store::commit::insert_archive_job(&tx, &archive_job)?;

    let is_tutorial = persist_store::highlights::root_topic_title(&tx, chat_session_id)?
        == TUTORIAL_ROOT_TITLE;
    if !is_tutorial {
        for user_id in persist_store::highlights::participants(&tx, chat_session_id)? {
            let rank = persist_store::highlights::highlight_count_for_user(&tx, user_id)?;
            persist_store::highlights::insert_highlight(&tx, chat_session_id, user_id, rank)?;
        }
    }

    persist_store::jobs::finish(&tx, job_id, now_utc())?;
    tx.commit().map_err(|e| PersistError::Store(e.to_string()))?;
    Ok(())
}

fn now_utc() -> chrono::DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use persist_core::MessageBody;
    use persist_interpreter::encode_message;
    use rusqlite::Connection;
    use tempfile::NamedTempFile;

    /// A scratch on-disk database, matching how a real worker talks to the
    /// store: each step below opens its own `Connection::open(&path)`
    /// rather than sharing one across the test.
    fn setup() -> (NamedTempFile, String) {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let conn = Connection::open(&path).unwrap();
        persist_store::init_db(&conn).unwrap();
        (file, path)
    }

    fn seed_tree(conn: &Connection, chat_id: i64, root_topic: i64, leaf_topic: i64, title: &str) {
        conn.execute(
            "INSERT INTO chat (id, topic_id) VALUES (?1, ?2)",
            rusqlite::params![chat_id, root_topic],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO topic (id, chat_id, parent_id, rank, level, title, description)
             VALUES (?1, ?2, NULL, 0, 1, ?3, '')",
            rusqlite::params![root_topic, chat_id, title],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO topic (id, chat_id, parent_id, rank, level, title, description)
             VALUES (?1, ?2, ?3, 1, 2, 'leaf', '')",
            rusqlite::params![leaf_topic, chat_id, root_topic],
        )
        .unwrap();
    }

    #[test]
    fn scenario_a_single_topic_chat() {
        let (_guard, path) = setup();
        let conn = Connection::open(&path).unwrap();
        seed_tree(&conn, 1, 1, 2, "General");
        conn.execute(
            "INSERT INTO chat_session (id, chat_id) VALUES (1, 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO chat_persist_job (id, chat_session_id, created) VALUES (1, 1, ?1)",
            rusqlite::params![Utc::now().to_rfc3339()],
        )
        .unwrap();

        let mut seq = 0i64;
        let mut push = |ts: i64, body: MessageBody| {
            seq += 1;
            persist_store::messages::insert_message(
                &conn,
                seq,
                1,
                chrono::DateTime::from_timestamp(ts, 0).unwrap(),
                &encode_message(&body),
            )
            .unwrap();
        };
        push(1345643927, MessageBody::MinuteCreate { topic_id: 2 });
        push(
            1345643936,
            MessageBody::TagCreate { tag_id: "a".into(), user_id: 1, name: "Tag".into() },
        );
        push(
            1345643943,
            MessageBody::TagCreate { tag_id: "b".into(), user_id: 1, name: "del".into() },
        );
        push(1345643948, MessageBody::TagDelete { tag_id: "b".into() });
        push(
            1345643953,
            MessageBody::TagCreate { tag_id: "c".into(), user_id: 1, name: "dup".into() },
        );
        push(
            1345643957,
            MessageBody::TagCreate { tag_id: "d".into(), user_id: 1, name: "dup".into() },
        );
        push(1345643963, MessageBody::MinuteUpdate { topic_id: 2 });
        drop(conn);

        let outcome = process_job(&path, 1, Duration::zero()).unwrap();
        assert_eq!(outcome, PersisterOutcome::Processed);

        let conn = Connection::open(&path).unwrap();
        let job = persist_store::jobs::get_job(&conn, 1).unwrap();
        assert_eq!(job.successful, Some(true));

        let minute_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chat_minute", [], |r| r.get(0))
            .unwrap();
        assert_eq!(minute_count, 2);

        let mut stmt = conn.prepare("SELECT name FROM chat_tag ORDER BY name").unwrap();
        let names: Vec<String> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(names, vec!["Tag".to_string(), "dup".to_string()]);

        let marker_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chat_speaking_marker", [], |r| r.get(0))
            .unwrap();
        assert_eq!(marker_count, 0);
    }

    #[test]
    fn duplicate_claim_loses_cleanly() {
        let (_guard, path) = setup();
        let conn = Connection::open(&path).unwrap();
        seed_tree(&conn, 1, 1, 2, "General");
        conn.execute("INSERT INTO chat_session (id, chat_id) VALUES (1, 1)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO chat_persist_job (id, chat_session_id, created, owner, start)
             VALUES (1, 1, ?1, 'other-worker', ?1)",
            rusqlite::params![Utc::now().to_rfc3339()],
        )
        .unwrap();
        drop(conn);

        let err = process_job(&path, 1, Duration::zero()).unwrap_err();
        assert!(matches!(err, PersistError::DuplicatePersistJob { job_id: 1 }));

        let conn = Connection::open(&path).unwrap();
        let job = persist_store::jobs::get_job(&conn, 1).unwrap();
        assert_eq!(job.owner.as_deref(), Some("other-worker"));
        assert_eq!(job.successful, None);
    }

    #[test]
    fn tutorial_chat_skips_highlights() {
        let (_guard, path) = setup();
        let conn = Connection::open(&path).unwrap();
        seed_tree(&conn, 1, 1, 2, "Tutorial");
        conn.execute("INSERT INTO chat_session (id, chat_id) VALUES (1, 1)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO chat_user (chat_session_id, user_id) VALUES (1, 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO chat_persist_job (id, chat_session_id, created) VALUES (1, 1, ?1)",
            rusqlite::params![Utc::now().to_rfc3339()],
        )
        .unwrap();
        persist_store::messages::insert_message(
            &conn,
            1,
            1,
            chrono::DateTime::from_timestamp(1, 0).unwrap(),
            &encode_message(&MessageBody::MinuteCreate { topic_id: 2 }),
        )
        .unwrap();
        persist_store::messages::insert_message(
            &conn,
            2,
            1,
            chrono::DateTime::from_timestamp(2, 0).unwrap(),
            &encode_message(&MessageBody::MinuteUpdate { topic_id: 2 }),
        )
        .unwrap();
        drop(conn);

        let outcome = process_job(&path, 1, Duration::zero()).unwrap();
        assert_eq!(outcome, PersisterOutcome::Processed);

        let conn = Connection::open(&path).unwrap();
        let highlight_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chat_highlight_session", [], |r| r.get(0))
            .unwrap();
        assert_eq!(highlight_count, 0);
        let archive_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chat_archive_job", [], |r| r.get(0))
            .unwrap();
        assert_eq!(archive_count, 1);
    }

    #[test]
    fn unclosed_minute_aborts_job() {
        let (_guard, path) = setup();
        let conn = Connection::open(&path).unwrap();
        seed_tree(&conn, 1, 1, 2, "General");
        conn.execute("INSERT INTO chat_session (id, chat_id) VALUES (1, 1)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO chat_persist_job (id, chat_session_id, created) VALUES (1, 1, ?1)",
            rusqlite::params![Utc::now().to_rfc3339()],
        )
        .unwrap();
        persist_store::messages::insert_message(
            &conn,
            1,
            1,
            chrono::DateTime::from_timestamp(1, 0).unwrap(),
            &encode_message(&MessageBody::MinuteCreate { topic_id: 2 }),
        )
        .unwrap();
        drop(conn);

        let err = process_job(&path, 1, Duration::zero()).unwrap_err();
        assert!(matches!(err, PersistError::InvalidChatMinute { .. }));

        let conn = Connection::open(&path).unwrap();
        let job = persist_store::jobs::get_job(&conn, 1).unwrap();
        assert_eq!(job.successful, Some(false));
        assert!(job.owner.is_some());
        let minute_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chat_minute", [], |r| r.get(0))
            .unwrap();
        assert_eq!(minute_count, 0);
    }
}
