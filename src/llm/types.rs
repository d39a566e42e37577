//! Provider-neutral chat types and errors.

use serde::{Deserialize, Serialize};

use crate::providers::ProviderId;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by provider adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The provider id has no adapter (or no catalog endpoint).
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// The HTTP request to the provider failed before a response arrived.
    #[error("API request failed: {0}")]
    Request(String),

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status} {status_text}")]
    Http { status: u16, status_text: String },

    /// A 2xx response whose body lacks the expected success-path fields.
    #[error("invalid response format from {provider} API")]
    Malformed { provider: &'static str },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Conversation role. Providers label the assistant side differently
/// ("assistant" vs "model"); adapters own that mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the outgoing payload, already flattened to plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Unified result of a chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub assistant_message: String,
    /// Best-effort usage figure; providers report this differently (absent,
    /// cumulative, output-only) and the adapter normalizes to "count or 0".
    pub total_token_count: u64,
}

/// One entry of a provider's model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
}

// =============================================================================
// CHAT API TRAIT
// =============================================================================

/// Provider-neutral async chat seam. Enables mocking the network in tests.
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    /// Send a conversation to the selected provider and model.
    ///
    /// # Errors
    ///
    /// Returns a [`ChatError`] on transport failure, non-2xx status, or a
    /// success response missing the expected fields.
    async fn send_chat(
        &self,
        api_key: &str,
        provider: ProviderId,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, ChatError>;

    /// Fetch the dynamic model catalog for providers that have one.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::UnsupportedProvider`] for providers with a static
    /// catalog, otherwise the same failure modes as [`ChatApi::send_chat`].
    async fn list_models(&self, provider: ProviderId) -> Result<Vec<ModelDescriptor>, ChatError>;
}
