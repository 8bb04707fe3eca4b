use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, opt_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::models::{Bookmark, Question};
use crate::store;
use serde_json::json;

fn handle_bookmarks_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match store::get_all::<Bookmark>(conn) {
        Ok(bookmarks) => ok(&req.id, json!({ "bookmarks": bookmarks })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

/// Toggle is its own inverse: delete when present, otherwise snapshot the
/// live question into a new bookmark. The snapshot (not a reference) is
/// deliberate; the bookmark stays readable whatever happens to the
/// question collection.
fn handle_bookmarks_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let question_id = match required_str(req, "questionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let note = opt_str(req, "note").unwrap_or_default();

    let existing = match store::get_one::<Bookmark>(conn, &question_id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    if existing.is_some() {
        if let Err(e) = store::delete_one::<Bookmark>(conn, &question_id) {
            return err(&req.id, "db_insert_failed", e.to_string(), None);
        }
        return ok(&req.id, json!({ "bookmarked": false }));
    }

    let question = match store::get_one::<Question>(conn, &question_id) {
        Ok(Some(q)) => q,
        Ok(None) => return err(&req.id, "not_found", "question not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let bookmark = Bookmark {
        question_id,
        note,
        question,
    };
    if let Err(e) = store::put_one(conn, &bookmark) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "bookmarked": true, "bookmark": bookmark }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "bookmarks.list" => Some(handle_bookmarks_list(state, req)),
        "bookmarks.toggle" => Some(handle_bookmarks_toggle(state, req)),
        _ => None,
    }
}
