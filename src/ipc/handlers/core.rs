use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::migrate;
use crate::models::Subject;
use crate::syllabus;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };

    // Import the legacy localStorage dump before anything reads. A failed
    // migration leaves the flag unset and the store untouched, so the
    // next workspace.select retries it.
    let migrated = match migrate::run_once(&conn, &path) {
        Ok(migrated) => migrated,
        Err(e) => return err(&req.id, "migration_failed", format!("{e:?}"), None),
    };

    state.workspace = Some(path.clone());
    state.db = Some(conn);
    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "migrated": migrated
        }),
    )
}

fn handle_syllabus_get(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let subjects: Vec<serde_json::Value> = Subject::ALL
        .iter()
        .map(|subject| {
            let chapters: Vec<serde_json::Value> = syllabus::chapters(*subject)
                .iter()
                .map(|c| json!({ "chapter": c.chapter, "topics": c.topics }))
                .collect();
            json!({ "subject": subject, "chapters": chapters })
        })
        .collect();
    ok(&req.id, json!({ "subjects": subjects }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "syllabus.get" => Some(handle_syllabus_get(state, req)),
        _ => None,
    }
}
