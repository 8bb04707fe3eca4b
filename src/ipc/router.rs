use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::kv::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::questions::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::answers::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::bookmarks::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::tasks::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::test_plans::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::dashboard::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::assistant::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
