use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_kv_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let key = match required_str(req, "key") {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    match db::kv_get_json(conn, &key) {
        Ok(value) => ok(
            &req.id,
            json!({ "value": value.unwrap_or(serde_json::Value::Null) }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_kv_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let key = match required_str(req, "key") {
        Ok(k) => k,
        Err(resp) => return resp,
    };
    let Some(value) = req.params.get("value") else {
        return err(&req.id, "bad_params", "missing value", None);
    };
    match db::kv_set_json(conn, &key, value) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "kv.get" => Some(handle_kv_get(state, req)),
        "kv.set" => Some(handle_kv_set(state, req)),
        _ => None,
    }
}
