//! Data plane of the generative-AI gateway. The HTTP call itself is owned
//! by the host UI (it holds the API key); the daemon owns everything
//! around it: the prompts sent up and the strict decoding of what comes
//! back.

use crate::models::{
    ChatMessage, ChatSender, Difficulty, Question, QuestionKind, SourceRef, Subject,
};
use anyhow::Context;
use serde::Deserialize;
use serde_json::json;

pub const GENERATION_MODEL: &str = "gemini-2.5-flash";

pub const ASSISTANT_SYSTEM_PROMPT: &str = "\
You are \"Prep Mentor\", a specialized tutor for medical entrance exam preparation. \
Your expertise is strictly limited to Physics, Chemistry and Biology at the entrance-exam level. \
Accuracy is paramount: verify every fact and formula before answering, and say so when unsure. \
Politely decline anything outside these three subjects. \
Structure each answer in four parts: a one-line short answer, a concise step-by-step \
explanation, common mistakes with exam tips, and one small related practice question with a hint. \
Use markdown bold for key terms and <sup> tags for exponents.";

/// A generated question as the model returns it: everything but the id,
/// which the daemon assigns on ingest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub subject: Subject,
    pub chapter: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    pub explanation: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub source: String,
}

impl QuestionDraft {
    /// Shape checks the response schema cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.question_text.trim().is_empty() {
            return Err("empty question text".to_string());
        }
        if self.options.len() < 2 {
            return Err(format!("only {} option(s)", self.options.len()));
        }
        if self.correct_option_index >= self.options.len() {
            return Err(format!(
                "correct index {} out of range for {} options",
                self.correct_option_index,
                self.options.len()
            ));
        }
        Ok(())
    }

    pub fn into_question(self, id: String) -> Question {
        Question {
            id,
            subject: self.subject,
            chapter: self.chapter,
            topic: self.topic,
            difficulty: self.difficulty,
            question_text: self.question_text,
            options: self.options,
            correct_option_index: self.correct_option_index,
            explanation: self.explanation,
            kind: self.kind,
            source: self.source,
        }
    }
}

pub fn generation_prompt(
    subject: Subject,
    chapters: &[String],
    topics: &[String],
    difficulty: Difficulty,
    count: usize,
) -> String {
    format!(
        "You are a lead question designer for a national medical entrance exam. \
Generate {count} brand-new, unique multiple-choice questions for a mock test, \
indistinguishable in style and rigor from the real paper.\n\
Subject: {subject}\n\
Chapters: {chapters}\n\
Topics: {topics}\n\
Difficulty: {difficulty:?}\n\
Each question must have exactly 4 options, one correct answer, and a concise \
explanation of why it is correct. Mix plain MCQ with assertion-reason and \
statement-based items where the topic supports them. Reply with a JSON array \
of question objects only, no surrounding prose.",
        chapters = chapters.join(", "),
        topics = topics.join(", "),
    )
}

/// Decode a question batch from raw model output. The schema-constrained
/// endpoint returns a bare JSON array, but models occasionally wrap it in
/// a markdown fence anyway.
pub fn decode_question_batch(raw: &str) -> anyhow::Result<Vec<QuestionDraft>> {
    serde_json::from_str(strip_fence(raw)).context("model output is not a question array")
}

fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim().strip_suffix("```").unwrap_or(inner).trim()
}

/// Build the generateContent request body for one assistant turn. The full
/// history is resent every call; the service is stateless and the daemon
/// never persists chat transcripts.
pub fn assistant_request(
    history: &[ChatMessage],
    new_message: &str,
    image_base64: Option<&str>,
) -> serde_json::Value {
    let mut contents: Vec<serde_json::Value> = Vec::with_capacity(history.len() + 1);
    for message in history {
        let mut parts: Vec<serde_json::Value> = Vec::new();
        if !message.text.is_empty() {
            parts.push(json!({ "text": strip_markup(&message.text) }));
        }
        if let Some(image) = &message.image {
            parts.push(json!({ "inlineData": { "mimeType": "image/jpeg", "data": image } }));
        }
        let role = match message.sender {
            ChatSender::User => "user",
            ChatSender::Bot => "model",
        };
        contents.push(json!({ "role": role, "parts": parts }));
    }

    let mut user_parts: Vec<serde_json::Value> = Vec::new();
    if let Some(image) = image_base64 {
        user_parts.push(json!({ "inlineData": { "mimeType": "image/jpeg", "data": image } }));
    }
    if !new_message.is_empty() {
        user_parts.push(json!({ "text": new_message }));
    }
    if !user_parts.is_empty() {
        contents.push(json!({ "role": "user", "parts": user_parts }));
    }

    json!({
        "model": GENERATION_MODEL,
        "contents": contents,
        "config": {
            "systemInstruction": ASSISTANT_SYSTEM_PROMPT,
            "tools": [{ "googleSearch": {} }],
        },
    })
}

#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

/// Pull the reply text and any web grounding sources out of a raw
/// generateContent response.
pub fn decode_assistant_reply(raw: &str) -> anyhow::Result<AssistantReply> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("assistant response is not JSON")?;
    let candidate = value
        .get("candidates")
        .and_then(|c| c.get(0))
        .context("assistant response has no candidates")?;

    let mut text = String::new();
    if let Some(parts) = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        for part in parts {
            if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
                text.push_str(t);
            }
        }
    }
    if text.is_empty() {
        anyhow::bail!("assistant response carries no text");
    }

    let mut sources = Vec::new();
    if let Some(chunks) = candidate
        .get("groundingMetadata")
        .and_then(|g| g.get("groundingChunks"))
        .and_then(|c| c.as_array())
    {
        for chunk in chunks {
            let Some(web) = chunk.get("web") else {
                continue;
            };
            if let (Some(uri), Some(title)) = (
                web.get("uri").and_then(|v| v.as_str()),
                web.get("title").and_then(|v| v.as_str()),
            ) {
                sources.push(SourceRef {
                    uri: uri.to_string(),
                    title: title.to_string(),
                });
            }
        }
    }

    Ok(AssistantReply { text, sources })
}

/// History text may carry presentation markup (<sup> etc.); the model
/// does not need it back.
fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
