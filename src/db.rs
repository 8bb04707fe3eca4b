use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("prepdeck.sqlite3");
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS questions(
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL
        )",
        [],
    )?;

    // Answers are append-only; the engine assigns the sequence key.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_answers(
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id TEXT NOT NULL,
            data TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_user_answers_question ON user_answers(question_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bookmarks(
            question_id TEXT PRIMARY KEY,
            data TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks(
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL
        )",
        [],
    )?;

    // Tuple key instead of the legacy "subject-chapter-topic" string.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS topic_analytics(
            subject TEXT NOT NULL,
            chapter TEXT NOT NULL,
            topic TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY(subject, chapter, topic)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS test_plans(
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

pub fn kv_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn kv_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO kv_store(key, value) VALUES(?, ?)",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}
