use crate::gateway;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{opt_str, optional_field};
use crate::ipc::types::{AppState, Request};
use crate::models::ChatMessage;
use serde_json::json;

/// Build the generateContent request body for the doubt-solving chat. The
/// host holds the API key and performs the call; chat history lives in
/// the UI only and is never persisted here.
fn handle_prepare(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let history: Vec<ChatMessage> = match optional_field(req, "history") {
        Ok(v) => v.unwrap_or_default(),
        Err(resp) => return resp,
    };
    let message = opt_str(req, "message").unwrap_or_default();
    let image = opt_str(req, "image");
    if message.trim().is_empty() && image.is_none() {
        return err(&req.id, "bad_params", "message or image required", None);
    }

    ok(
        &req.id,
        json!({
            "model": gateway::GENERATION_MODEL,
            "body": gateway::assistant_request(&history, &message, image.as_deref()),
        }),
    )
}

fn handle_decode(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("raw").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing raw", None);
    };
    match gateway::decode_assistant_reply(raw) {
        Ok(reply) => ok(
            &req.id,
            json!({ "text": reply.text, "sources": reply.sources }),
        ),
        Err(e) => err(&req.id, "bad_model_output", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assistant.prepare" => Some(handle_prepare(state, req)),
        "assistant.decode" => Some(handle_decode(state, req)),
        _ => None,
    }
}
