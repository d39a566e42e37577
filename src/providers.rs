//! LLM provider catalog.
//!
//! Three providers ship a static model list; OpenRouter's is fetched from its
//! catalog endpoint at runtime and cached (see `cache::Cache::openrouter_models`).

use serde::{Deserialize, Serialize};

use crate::llm::types::ModelDescriptor;

/// A supported chat-completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Google,
    OpenAi,
    Anthropic,
    OpenRouter,
}

impl ProviderId {
    pub const ALL: [ProviderId; 4] =
        [ProviderId::Google, ProviderId::OpenAi, ProviderId::Anthropic, ProviderId::OpenRouter];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::OpenRouter => "openrouter",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "google" => Some(Self::Google),
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            "openrouter" => Some(Self::OpenRouter),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::OpenRouter => "OpenRouter",
        }
    }

    /// Chat endpoint base. Google's is a prefix the model id is appended to;
    /// the others are either the full endpoint or an API root.
    #[must_use]
    pub fn api_base_url(self) -> &'static str {
        match self {
            Self::Google => "https://generativelanguage.googleapis.com/v1beta/models/",
            Self::OpenAi => "https://api.openai.com/v1/chat/completions",
            Self::Anthropic => "https://api.anthropic.com/v1/messages",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Built-in model catalog, `(id, display name)`. Empty for OpenRouter.
    #[must_use]
    pub fn builtin_models(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Google => &[
                ("gemini-2.5-flash", "Gemini 2.5 Flash"),
                ("gemini-2.5-flash-lite", "Gemini 2.5 Flash Lite"),
                ("gemini-2.5-pro", "Gemini 2.5 Pro"),
                ("gemini-2.0-flash", "Gemini 2.0 Flash"),
                ("gemini-2.0-flash-lite", "Gemini 2.0 Flash Lite"),
                ("gemini-2.0-pro", "Gemini 2.0 Pro"),
                ("gemini-1.5-flash", "Gemini 1.5 Flash"),
                ("gemini-1.5-pro", "Gemini 1.5 Pro"),
            ],
            Self::OpenAi => &[
                ("gpt-4o-mini", "GPT-4o mini"),
                ("gpt-4.1-nano", "GPT-4.1 nano"),
                ("o4-mini", "o4-mini"),
                ("o3-mini", "o3-mini"),
                ("o3", "o3"),
            ],
            Self::Anthropic => &[
                ("claude-opus-4-0", "Claude Opus 4"),
                ("claude-sonnet-4-0", "Claude Sonnet 4"),
                ("claude-3-7-sonnet-latest", "Claude Sonnet 3.7"),
                ("claude-3-5-sonnet-latest", "Claude Sonnet 3.5"),
                ("claude-3-5-haiku-latest", "Claude Haiku 3.5"),
            ],
            Self::OpenRouter => &[],
        }
    }
}

/// Provider ids sorted by display name, for the provider picker.
#[must_use]
pub fn provider_ids_sorted() -> Vec<ProviderId> {
    let mut ids = ProviderId::ALL.to_vec();
    ids.sort_by(|a, b| a.display_name().cmp(b.display_name()));
    ids
}

/// Selectable models for a provider, sorted by display name.
///
/// `openrouter_models` supplies the dynamic catalog when the provider is
/// OpenRouter; it is ignored otherwise.
#[must_use]
pub fn models_for(provider: ProviderId, openrouter_models: &[ModelDescriptor]) -> Vec<ModelDescriptor> {
    let mut models: Vec<ModelDescriptor> = if provider == ProviderId::OpenRouter {
        openrouter_models.to_vec()
    } else {
        provider
            .builtin_models()
            .iter()
            .map(|(id, name)| ModelDescriptor { id: (*id).into(), name: (*name).into() })
            .collect()
    };
    models.sort_by(|a, b| a.name.cmp(&b.name));
    models
}

/// Resolve `model` against a provider's catalog, falling back to the first
/// catalog entry when the id is unknown, and to the bare id when the catalog
/// is empty.
#[must_use]
pub fn model_or_default(
    provider: ProviderId,
    model: &str,
    openrouter_models: &[ModelDescriptor],
) -> ModelDescriptor {
    let models = models_for(provider, openrouter_models);
    if let Some(found) = models.iter().find(|m| m.id == model) {
        return found.clone();
    }
    models
        .into_iter()
        .next()
        .unwrap_or_else(|| ModelDescriptor { id: model.into(), name: "Unknown Model".into() })
}
