use crate::db;
use crate::gateway;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_field, required_i64, required_str, required_subject};
use crate::ipc::types::{AppState, Request};
use crate::migrate;
use crate::models::{Difficulty, Question};
use crate::store;
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;

fn handle_questions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match store::get_all::<Question>(conn) {
        Ok(questions) => ok(&req.id, json!({ "questions": questions })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_questions_prompt(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Prompt assembly needs no store access, but an unopened workspace is
    // still a caller mistake worth flagging early.
    if let Err(resp) = db_conn(state, req) {
        return resp;
    }
    let subject = match required_subject(req, "subject") {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let chapters: Vec<String> = match required_field(req, "chapters") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let topics: Vec<String> = match required_field(req, "topics") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let difficulty: Difficulty = match required_field(req, "difficulty") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let count = match required_i64(req, "count") {
        Ok(n) if n > 0 => n as usize,
        Ok(_) => return err(&req.id, "bad_params", "count must be positive", None),
        Err(resp) => return resp,
    };

    ok(
        &req.id,
        json!({
            "model": gateway::GENERATION_MODEL,
            "prompt": gateway::generation_prompt(subject, &chapters, &topics, difficulty, count),
        }),
    )
}

/// Take raw model output, keep the usable drafts, assign ids and insert.
/// A smaller-than-requested batch is a valid partial success; a batch
/// with nothing usable is an error the UI must show.
fn handle_questions_ingest(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let raw = match required_str(req, "raw") {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let drafts = match gateway::decode_question_batch(&raw) {
        Ok(d) => d,
        Err(e) => return err(&req.id, "bad_model_output", format!("{e:#}"), None),
    };

    let mut seen: HashSet<String> = match db::kv_get_json(conn, migrate::SEEN_TEXTS_KEY) {
        Ok(Some(v)) => serde_json::from_value(v).unwrap_or_default(),
        Ok(None) => HashSet::new(),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut accepted: Vec<Question> = Vec::new();
    let mut skipped_seen = 0usize;
    let mut skipped_invalid = 0usize;
    for draft in drafts {
        if draft.validate().is_err() {
            skipped_invalid += 1;
            continue;
        }
        // `seen` also catches duplicates inside the batch itself.
        if !seen.insert(draft.question_text.clone()) {
            skipped_seen += 1;
            continue;
        }
        accepted.push(draft.into_question(Uuid::new_v4().to_string()));
    }

    if accepted.is_empty() {
        return err(
            &req.id,
            "empty_generation",
            "model returned no usable questions",
            Some(json!({ "skippedSeen": skipped_seen, "skippedInvalid": skipped_invalid })),
        );
    }

    if let Err(e) = store::add_many(conn, &accepted) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "questions": accepted,
            "added": accepted.len(),
            "skippedSeen": skipped_seen,
            "skippedInvalid": skipped_invalid,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "questions.list" => Some(handle_questions_list(state, req)),
        "questions.prompt" => Some(handle_questions_prompt(state, req)),
        "questions.ingest" => Some(handle_questions_ingest(state, req)),
        _ => None,
    }
}
