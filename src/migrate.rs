use crate::db;
use crate::legacy::{self, LegacyDump};
use crate::models::{Bookmark, PlannerTask, Question, TestPlan};
use crate::store;
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;

pub const MIGRATION_FLAG_KEY: &str = "migratedFromLegacy";
pub const SEEN_TEXTS_KEY: &str = "seenQuestionTexts";
pub const SOLVED_INCORRECT_KEY: &str = "solvedIncorrectIds";
pub const HAS_SEEN_INTRO_KEY: &str = "hasSeenIntro";

/// One-shot import of the legacy localStorage dump, gated by a kv flag.
///
/// The whole import runs in a single transaction with the flag write at
/// the end, so an interrupted run leaves no partial state behind. Entity
/// collections are written with upsert semantics anyway: a retry against
/// a workspace someone already touched must not die on a key collision.
/// Returns true when a legacy dump was actually imported.
pub fn run_once(conn: &Connection, workspace: &Path) -> anyhow::Result<bool> {
    if db::kv_get_json(conn, MIGRATION_FLAG_KEY)?
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
    {
        return Ok(false);
    }

    let dump = LegacyDump::load(workspace)?;
    let Some(dump) = dump else {
        // Fresh install: nothing to migrate, never look again.
        db::kv_set_json(conn, MIGRATION_FLAG_KEY, &json!(true))?;
        return Ok(false);
    };

    let questions: Vec<Question> = dump.entities(legacy::KEY_QUESTIONS)?;
    let answers = dump.entities(legacy::KEY_USER_ANSWERS)?;
    let bookmarks: Vec<Bookmark> = dump.entities(legacy::KEY_BOOKMARKS)?;
    let tasks: Vec<PlannerTask> = dump.entities(legacy::KEY_TASKS)?;
    let test_plans: Vec<TestPlan> = dump.entities(legacy::KEY_TEST_PLANS)?;
    let topic_stats = dump.topic_stats()?;
    let seen_texts = dump.string_set(legacy::KEY_SEEN_TEXTS)?;
    let solved_incorrect = dump.string_set(legacy::KEY_SOLVED_INCORRECT)?;

    let tx = conn.unchecked_transaction()?;
    for q in &questions {
        store::put_one(&tx, q)?;
    }
    store::answers_append(&tx, &answers)?;
    for b in &bookmarks {
        store::put_one(&tx, b)?;
    }
    for t in &tasks {
        store::put_one(&tx, t)?;
    }
    for p in &test_plans {
        store::put_one(&tx, p)?;
    }
    for (key, stats) in &topic_stats {
        store::topic_stats_put(&tx, key, stats)?;
    }
    if !seen_texts.is_empty() {
        db::kv_set_json(&tx, SEEN_TEXTS_KEY, &json!(seen_texts))?;
    }
    if !solved_incorrect.is_empty() {
        db::kv_set_json(&tx, SOLVED_INCORRECT_KEY, &json!(solved_incorrect))?;
    }
    if dump.flag(legacy::KEY_HAS_SEEN_INTRO) {
        db::kv_set_json(&tx, HAS_SEEN_INTRO_KEY, &json!(true))?;
    }
    db::kv_set_json(&tx, MIGRATION_FLAG_KEY, &json!(true))?;
    tx.commit()?;

    Ok(true)
}
