use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::models::Subject;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn opt_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn opt_i64(req: &Request, key: &str) -> Result<Option<i64>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be an integer", key),
                None,
            )
        }),
    }
}

pub fn required_f64(req: &Request, key: &str) -> Result<f64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_subject(req: &Request, key: &str) -> Result<Subject, serde_json::Value> {
    let raw = required_str(req, key)?;
    Subject::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("{} must be one of: Physics, Chemistry, Biology", key),
            None,
        )
    })
}

/// Decode one params field into a typed value.
pub fn required_field<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<T, serde_json::Value> {
    let Some(value) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    serde_json::from_value(value.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("malformed {}: {}", key, e),
            None,
        )
    })
}

pub fn optional_field<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Option<T>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => serde_json::from_value(v.clone()).map(Some).map_err(|e| {
            err(
                &req.id,
                "bad_params",
                format!("malformed {}: {}", key, e),
                None,
            )
        }),
    }
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
