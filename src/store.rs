use crate::models::{
    Bookmark, PlannerTask, Question, TestPlan, TopicKey, TopicStats, TopicStatsMap, UserAnswer,
};
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record stored in one of the keyed collections. Each collection is a
/// two-column table: the primary key and the record body as JSON.
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;

    fn key(&self) -> &str;
}

impl Record for Question {
    const TABLE: &'static str = "questions";
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for Bookmark {
    const TABLE: &'static str = "bookmarks";
    const KEY_COLUMN: &'static str = "question_id";

    fn key(&self) -> &str {
        &self.question_id
    }
}

impl Record for PlannerTask {
    const TABLE: &'static str = "tasks";
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> &str {
        &self.id
    }
}

impl Record for TestPlan {
    const TABLE: &'static str = "test_plans";
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> &str {
        &self.id
    }
}

/// Every record in a collection. Order is unspecified.
pub fn get_all<T: Record>(conn: &Connection) -> anyhow::Result<Vec<T>> {
    let sql = format!("SELECT data FROM {}", T::TABLE);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|raw| serde_json::from_str(&raw).with_context(|| format!("corrupt {} record", T::TABLE)))
        .collect()
}

pub fn get_one<T: Record>(conn: &Connection, key: &str) -> anyhow::Result<Option<T>> {
    let sql = format!(
        "SELECT data FROM {} WHERE {} = ?",
        T::TABLE,
        T::KEY_COLUMN
    );
    let raw: Option<String> = conn.query_row(&sql, [key], |r| r.get(0)).optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("corrupt {} record", T::TABLE))?,
        )),
        None => Ok(None),
    }
}

/// Insert-only batch write. The whole batch runs in one transaction and
/// fails on any primary-key collision; empty input is a no-op.
pub fn add_many<T: Record>(conn: &Connection, records: &[T]) -> anyhow::Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let tx = conn.unchecked_transaction()?;
    {
        let sql = format!(
            "INSERT INTO {}({}, data) VALUES(?, ?)",
            T::TABLE,
            T::KEY_COLUMN
        );
        let mut stmt = tx.prepare(&sql)?;
        for record in records {
            stmt.execute((record.key(), serde_json::to_string(record)?))?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Insert-or-replace by primary key; idempotent.
pub fn put_one<T: Record>(conn: &Connection, record: &T) -> anyhow::Result<()> {
    let sql = format!(
        "INSERT OR REPLACE INTO {}({}, data) VALUES(?, ?)",
        T::TABLE,
        T::KEY_COLUMN
    );
    conn.execute(&sql, (record.key(), serde_json::to_string(record)?))?;
    Ok(())
}

/// Delete by primary key; absent keys are a no-op, not an error.
pub fn delete_one<T: Record>(conn: &Connection, key: &str) -> anyhow::Result<()> {
    let sql = format!("DELETE FROM {} WHERE {} = ?", T::TABLE, T::KEY_COLUMN);
    conn.execute(&sql, [key])?;
    Ok(())
}

/// Append-only answer log; the engine assigns the sequence key.
pub fn answers_all(conn: &Connection) -> anyhow::Result<Vec<UserAnswer>> {
    let mut stmt = conn.prepare("SELECT data FROM user_answers")?;
    let rows = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|raw| serde_json::from_str(&raw).context("corrupt user_answers record"))
        .collect()
}

/// Raw append without its own transaction; callers wrap it together with
/// whatever else the same session writes.
pub fn answers_append(conn: &Connection, answers: &[UserAnswer]) -> anyhow::Result<()> {
    let mut stmt = conn.prepare("INSERT INTO user_answers(question_id, data) VALUES(?, ?)")?;
    for answer in answers {
        stmt.execute((&answer.question_id, serde_json::to_string(answer)?))?;
    }
    Ok(())
}

pub fn topic_stats_all(conn: &Connection) -> anyhow::Result<TopicStatsMap> {
    let mut stmt = conn.prepare("SELECT subject, chapter, topic, data FROM topic_analytics")?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = TopicStatsMap::new();
    for (subject, chapter, topic, raw) in rows {
        let subject = crate::models::Subject::parse(&subject)
            .with_context(|| format!("unknown subject in topic_analytics: {subject}"))?;
        let stats: TopicStats =
            serde_json::from_str(&raw).context("corrupt topic_analytics record")?;
        out.insert(TopicKey::new(subject, chapter, topic), stats);
    }
    Ok(out)
}

pub fn topic_stats_get(conn: &Connection, key: &TopicKey) -> anyhow::Result<Option<TopicStats>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT data FROM topic_analytics WHERE subject = ? AND chapter = ? AND topic = ?",
            (key.subject.as_str(), &key.chapter, &key.topic),
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).context("corrupt topic_analytics record")?,
        )),
        None => Ok(None),
    }
}

pub fn topic_stats_put(
    conn: &Connection,
    key: &TopicKey,
    stats: &TopicStats,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO topic_analytics(subject, chapter, topic, data)
         VALUES(?, ?, ?, ?)",
        (
            key.subject.as_str(),
            &key.chapter,
            &key.topic,
            serde_json::to_string(stats)?,
        ),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db;
    use crate::models::{Difficulty, QuestionKind, Subject};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_workspace(prefix: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ))
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            subject: Subject::Physics,
            chapter: "Kinematics".to_string(),
            topic: "Motion".to_string(),
            difficulty: Difficulty::Medium,
            question_text: format!("text {id}"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option_index: 1,
            explanation: "because".to_string(),
            kind: QuestionKind::Mcq,
            source: "generated".to_string(),
        }
    }

    #[test]
    fn add_many_then_get_all_round_trips_by_id() {
        let conn = open_db(&temp_workspace("prepdeck-store-roundtrip")).expect("open");
        let batch: Vec<Question> = (0..5).map(|i| question(&format!("q{i}"))).collect();
        add_many(&conn, &batch).expect("insert");

        let mut read_ids: Vec<String> = get_all::<Question>(&conn)
            .expect("get_all")
            .into_iter()
            .map(|q| q.id)
            .collect();
        read_ids.sort();
        let mut want: Vec<String> = batch.iter().map(|q| q.id.clone()).collect();
        want.sort();
        assert_eq!(read_ids, want);
    }

    #[test]
    fn add_many_rejects_the_whole_batch_on_collision() {
        let conn = open_db(&temp_workspace("prepdeck-store-collide")).expect("open");
        add_many(&conn, &[question("q1")]).expect("first insert");

        let batch = vec![question("q2"), question("q1"), question("q3")];
        assert!(add_many(&conn, &batch).is_err());

        // Nothing from the failed batch may land.
        let all: Vec<Question> = get_all(&conn).expect("get_all");
        let ids: Vec<&str> = all.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1"]);
    }

    #[test]
    fn put_one_replaces_and_delete_one_tolerates_absence() {
        let conn = open_db(&temp_workspace("prepdeck-store-put")).expect("open");
        let mut q = question("q1");
        put_one(&conn, &q).expect("insert");
        q.explanation = "replaced".to_string();
        put_one(&conn, &q).expect("replace");

        let all: Vec<Question> = get_all(&conn).expect("get_all");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].explanation, "replaced");

        delete_one::<Question>(&conn, "q1").expect("delete");
        delete_one::<Question>(&conn, "q1").expect("second delete is a no-op");
        assert!(get_one::<Question>(&conn, "q1").expect("get").is_none());
    }

    #[test]
    fn topic_stats_round_trip_on_tuple_key() {
        let conn = open_db(&temp_workspace("prepdeck-store-topics")).expect("open");
        let key = TopicKey::new(Subject::Chemistry, "p-Block Elements", "Halogens");
        let mut stats = TopicStats::default();
        stats.total_time_spent = 25;
        topic_stats_put(&conn, &key, &stats).expect("put");

        let map = topic_stats_all(&conn).expect("all");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&key).map(|s| s.total_time_spent), Some(25));
    }
}
