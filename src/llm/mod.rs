//! LLM — multi-provider chat adapter.
//!
//! DESIGN
//! ======
//! Four wire protocols (Gemini `contents`/`parts`, OpenAI chat completions,
//! Anthropic messages, OpenRouter's OpenAI dialect) are normalized behind the
//! [`ChatApi`] trait: an ordered `[ChatMessage]` in, a single
//! `{assistant_message, total_token_count}` out. Request building and
//! response parsing are pure functions in each adapter module so tests never
//! need a live endpoint.

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod openrouter;
pub mod types;

use std::time::Duration;

pub use types::{ChatApi, ChatMessage, ChatReply, ModelDescriptor, Role};
use types::ChatError;

use crate::providers::ProviderId;

pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 120;
pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Response size ceiling sent to providers that require one.
pub(crate) const MAX_TOKENS: u32 = 4000;
/// Sampling temperature sent to providers that accept one.
pub(crate) const TEMPERATURE: f64 = 0.7;

/// Map a non-success HTTP status into the adapter error. Pure, shared by all
/// adapters.
pub(crate) fn ensure_success(status: u16, status_text: &str) -> Result<(), ChatError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    Err(ChatError::Http { status, status_text: status_text.to_string() })
}

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete [`ChatApi`] implementation dispatching on [`ProviderId`].
///
/// Base URLs default to each provider's public endpoint and are overridable
/// for offline tests.
pub struct ChatClient {
    http: reqwest::Client,
    google_base: String,
    openai_base: String,
    anthropic_base: String,
    openrouter_base: String,
}

impl ChatClient {
    /// Build a client with the default endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new() -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChatError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            google_base: ProviderId::Google.api_base_url().into(),
            openai_base: ProviderId::OpenAi.api_base_url().into(),
            anthropic_base: ProviderId::Anthropic.api_base_url().into(),
            openrouter_base: ProviderId::OpenRouter.api_base_url().into(),
        })
    }

    /// Override one provider's base URL (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, provider: ProviderId, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        match provider {
            ProviderId::Google => self.google_base = base_url,
            ProviderId::OpenAi => self.openai_base = base_url,
            ProviderId::Anthropic => self.anthropic_base = base_url,
            ProviderId::OpenRouter => self.openrouter_base = base_url,
        }
        self
    }
}

#[async_trait::async_trait]
impl ChatApi for ChatClient {
    async fn send_chat(
        &self,
        api_key: &str,
        provider: ProviderId,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, ChatError> {
        match provider {
            ProviderId::Google => google::send(&self.http, &self.google_base, api_key, model, messages).await,
            ProviderId::OpenAi => openai::send(&self.http, &self.openai_base, api_key, model, messages).await,
            ProviderId::Anthropic => {
                anthropic::send(&self.http, &self.anthropic_base, api_key, model, messages).await
            }
            ProviderId::OpenRouter => {
                openrouter::send(&self.http, &self.openrouter_base, api_key, model, messages).await
            }
        }
    }

    async fn list_models(&self, provider: ProviderId) -> Result<Vec<ModelDescriptor>, ChatError> {
        match provider {
            ProviderId::OpenRouter => openrouter::fetch_models(&self.http, &self.openrouter_base).await,
            other => Err(ChatError::UnsupportedProvider(other.as_str().into())),
        }
    }
}
