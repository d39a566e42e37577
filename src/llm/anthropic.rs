//! Anthropic Messages API adapter.
//!
//! Auth is an `x-api-key` header plus a pinned `anthropic-version`; the reply
//! text lives in `content[0].text` and usage reports output tokens only.

use serde::Serialize;
use serde_json::Value;

use super::openai::{wire_messages, WireMessage};
use super::types::{ChatError, ChatMessage, ChatReply};

const PROVIDER: &str = "Claude";
const API_VERSION: &str = "2023-06-01";
const SYSTEM_PROMPT: &str =
    "You are Claude, an AI assistant. Please format your response in lightweight markdown (no HTML tags).";

pub(crate) async fn send(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
) -> Result<ChatReply, ChatError> {
    let body = build_body(model, messages);

    let response = http
        .post(base_url)
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
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
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'static str,
    messages: Vec<WireMessage<'a>>,
}

pub(crate) fn build_body<'a>(model: &'a str, messages: &'a [ChatMessage]) -> ApiRequest<'a> {
    ApiRequest {
        model,
        max_tokens: super::MAX_TOKENS,
        temperature: super::TEMPERATURE,
        system: SYSTEM_PROMPT,
        messages: wire_messages(messages),
    }
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_response(json: &str) -> Result<ChatReply, ChatError> {
    let root: Value = serde_json::from_str(json).map_err(|_| ChatError::Malformed { provider: PROVIDER })?;
    let assistant_message = root
        .get("content")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .ok_or(ChatError::Malformed { provider: PROVIDER })?
        .to_string();
    let total_token_count = root
        .get("usage")
        .and_then(|u| u.get("output_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    Ok(ChatReply { assistant_message, total_token_count })
}
