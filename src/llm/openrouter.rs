//! OpenRouter adapter: chat completions plus the dynamic model catalog.
//!
//! Speaks the OpenAI chat-completions dialect but leaves token and sampling
//! limits to the routed model's own defaults.

use serde::Serialize;
use serde_json::Value;

use super::openai::{parse_completions, wire_messages, WireMessage};
use super::types::{ChatError, ChatMessage, ChatReply, ModelDescriptor};

const PROVIDER: &str = "OpenRouter";

pub(crate) async fn send(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
) -> Result<ChatReply, ChatError> {
    let url = format!("{base_url}/chat/completions");
    let body = build_body(model, messages);

    let response = http
        .post(url)
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
    parse_completions(&text, PROVIDER)
}

/// Fetch the model catalog: GET `{base}/models` -> `{data: [{id, name}]}`.
pub(crate) async fn fetch_models(
    http: &reqwest::Client,
    base_url: &str,
) -> Result<Vec<ModelDescriptor>, ChatError> {
    let url = format!("{base_url}/models");
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| ChatError::Request(e.to_string()))?;

    let status = response.status();
    super::ensure_success(status.as_u16(), status.canonical_reason().unwrap_or_default())?;
    let text = response
        .text()
        .await
        .map_err(|e| ChatError::Request(e.to_string()))?;
    parse_models(&text)
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
pub(crate) struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

pub(crate) fn build_body<'a>(model: &'a str, messages: &'a [ChatMessage]) -> ApiRequest<'a> {
    ApiRequest { model, messages: wire_messages(messages) }
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn parse_models(json: &str) -> Result<Vec<ModelDescriptor>, ChatError> {
    let root: Value = serde_json::from_str(json).map_err(|_| ChatError::Malformed { provider: PROVIDER })?;
    let data = root
        .get("data")
        .and_then(Value::as_array)
        .ok_or(ChatError::Malformed { provider: PROVIDER })?;

    let models = data
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(Value::as_str)?;
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(id);
            Some(ModelDescriptor { id: id.to_string(), name: name.to_string() })
        })
        .collect();
    Ok(models)
}
