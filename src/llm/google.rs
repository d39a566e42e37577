//! Gemini `generateContent` adapter.
//!
//! Auth travels as a query-string key; the conversation is reshaped into
//! `contents[].parts[].text` with the assistant side labeled `"model"`.

use serde::Serialize;
use serde_json::Value;

use super::types::{ChatError, ChatMessage, ChatReply, Role};

const PROVIDER: &str = "Gemini";
const SYSTEM_PROMPT: &str =
    "You are Gemini, an AI assistant. Please format your response in lightweight markdown (no HTML tags).";

pub(crate) async fn send(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
) -> Result<ChatReply, ChatError> {
    let url = format!("{base_url}{model}:generateContent?key={api_key}");
    let body = build_body(messages);

    let response = http
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| ChatError::Request(e.to_string()))?;

    let status = response.status();
    super::ensure_success(status.as_u16(), status.canonical_reason().unwrap_or_default())?;
    let text = response
        .text()
        .await
        .map_err(|e| ChatError::Request(e.to_string()))?;
    parse_response(&text)
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
pub(crate) struct ApiRequest<'a> {
    system_instruction: Instruction,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Instruction {
    parts: [OwnedPart; 1],
}

#[derive(Serialize)]
struct OwnedPart {
    text: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

pub(crate) fn build_body(messages: &[ChatMessage]) -> ApiRequest<'_> {
    let contents = messages
        .iter()
        .map(|message| Content {
            role: match message.role {
                Role::User => "user",
                Role::Assistant => "model",
            },
            parts: [Part { text: &message.content }],
        })
        .collect();
    ApiRequest { system_instruction: Instruction { parts: [OwnedPart { text: SYSTEM_PROMPT }] }, contents }
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_response(json: &str) -> Result<ChatReply, ChatError> {
    let root: Value = serde_json::from_str(json).map_err(|_| ChatError::Malformed { provider: PROVIDER })?;
    let assistant_message = root
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .and_then(|p| p.first())
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str)
        .ok_or(ChatError::Malformed { provider: PROVIDER })?
        .to_string();
    let total_token_count = root
        .get("usageMetadata")
        .and_then(|u| u.get("totalTokenCount"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    Ok(ChatReply { assistant_message, total_token_count })
}
