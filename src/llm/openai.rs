//! OpenAI chat-completions adapter.

use serde::Serialize;
use serde_json::Value;

use super::types::{ChatError, ChatMessage, ChatReply, Role};

const PROVIDER: &str = "OpenAI";

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
        .bearer_auth(api_key)
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
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
pub(crate) struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

pub(crate) fn wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|message| WireMessage {
            role: match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &message.content,
        })
        .collect()
}

pub(crate) fn build_body<'a>(model: &'a str, messages: &'a [ChatMessage]) -> ApiRequest<'a> {
    ApiRequest {
        model,
        messages: wire_messages(messages),
        max_tokens: super::MAX_TOKENS,
        temperature: super::TEMPERATURE,
    }
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_response(json: &str) -> Result<ChatReply, ChatError> {
    parse_completions(json, PROVIDER)
}

/// Shared parser for the chat-completions response dialect (also spoken by
/// OpenRouter): `choices[0].message.content` + `usage.total_tokens`.
pub(crate) fn parse_completions(json: &str, provider: &'static str) -> Result<ChatReply, ChatError> {
    let root: Value = serde_json::from_str(json).map_err(|_| ChatError::Malformed { provider })?;
    let assistant_message = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .ok_or(ChatError::Malformed { provider })?
        .to_string();
    let total_token_count = root
        .get("usage")
        .and_then(|u| u.get("total_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    Ok(ChatReply { assistant_message, total_token_count })
}
