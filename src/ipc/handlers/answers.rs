use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_field, required_str};
use crate::ipc::types::{AppState, Request};
use crate::migrate;
use crate::models::{Question, UserAnswer};
use crate::store;
use serde_json::json;
use std::collections::BTreeSet;

fn handle_answers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match store::answers_all(conn) {
        Ok(answers) => ok(&req.id, json!({ "answers": answers })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

/// End of a practice session: append the session's answers and remember
/// the completed question texts so generation never repeats them.
fn handle_session_complete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let answers: Vec<UserAnswer> = match required_field(req, "answers") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let question_ids: Vec<String> = match required_field(req, "questionIds") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut seen: BTreeSet<String> = match db::kv_get_json(conn, migrate::SEEN_TEXTS_KEY) {
        Ok(Some(v)) => serde_json::from_value(v).unwrap_or_default(),
        Ok(None) => BTreeSet::new(),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    for id in &question_ids {
        match store::get_one::<Question>(conn, id) {
            Ok(Some(q)) => {
                seen.insert(q.question_text);
            }
            Ok(None) => {}
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };
    if let Err(e) = store::answers_append(&tx, &answers) {
        let _ = tx.rollback();
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    if let Err(e) = db::kv_set_json(&tx, migrate::SEEN_TEXTS_KEY, &json!(seen)) {
        let _ = tx.rollback();
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    if let Err(e) = tx.commit() {
        return err(&req.id, "db_tx_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({ "recorded": answers.len(), "seenTexts": seen.len() }),
    )
}

/// Mark an incorrectly answered question as since-solved; it drops out of
/// the dashboard's incorrect list but the answer log keeps the miss.
fn handle_answers_mark_solved(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let question_id = match required_str(req, "questionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut solved: BTreeSet<String> = match db::kv_get_json(conn, migrate::SOLVED_INCORRECT_KEY) {
        Ok(Some(v)) => serde_json::from_value(v).unwrap_or_default(),
        Ok(None) => BTreeSet::new(),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    solved.insert(question_id);
    if let Err(e) = db::kv_set_json(conn, migrate::SOLVED_INCORRECT_KEY, &json!(solved)) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "solvedIncorrectIds": solved }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "answers.list" => Some(handle_answers_list(state, req)),
        "session.complete" => Some(handle_session_complete(state, req)),
        "answers.markSolved" => Some(handle_answers_mark_solved(state, req)),
        _ => None,
    }
}
