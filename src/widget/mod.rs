//! State manager / orchestrator.
//!
//! DESIGN
//! ======
//! [`Widget`] owns the one [`WidgetState`] record and is its only writer.
//! Every UI event maps to a named transition method here (or in the `chat`,
//! `content`, `code`, and `settings` submodules); the rendering layer reads
//! `state()` and never mutates. Network seams are trait objects so the whole
//! transition surface is testable without sockets.
//!
//! CONCURRENCY
//! ===========
//! Transition methods take `&mut self` and run to completion, so async
//! completions can never interleave writes. Loading flags remain the guard
//! against trigger-level re-entrancy (a second "load posts" while one is in
//! flight is a no-op), and fan-out fetches are joined before any state is
//! composed from them.

mod chat;
mod code;
mod content;
mod settings;

use std::sync::Arc;

use tracing::info;

use crate::cache::Cache;
use crate::fetch::{ContentSource, FetchError, WebContentSource};
use crate::kv::KeyValueStore;
use crate::llm::types::{ChatApi, ChatError};
use crate::llm::ChatClient;
use crate::providers::ProviderId;
use crate::state::{ChatPhase, Tab, WidgetState};

/// Construction failure: one of the HTTP clients could not be built.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// The widget core: state record, cache handle, and the two network seams.
pub struct Widget {
    state: WidgetState,
    cache: Cache,
    chat: Arc<dyn ChatApi>,
    content: Arc<dyn ContentSource>,
}

impl Widget {
    /// Assemble a widget from pre-built parts (tests inject mocks here).
    #[must_use]
    pub fn new(cache: Cache, chat: Arc<dyn ChatApi>, content: Arc<dyn ContentSource>) -> Self {
        Self { state: WidgetState::new(), cache, chat, content }
    }

    /// Wire a widget against the real provider and git-hosting endpoints.
    ///
    /// `page_url` is the URL of the document the widget is mounted on; it
    /// carries the content identity that scopes chat caching.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn with_defaults(store: Arc<dyn KeyValueStore>, page_url: &str) -> Result<Self, SetupError> {
        let cache = Cache::new(store, page_url);
        let chat = Arc::new(ChatClient::new()?);
        let content = Arc::new(WebContentSource::new(cache.clone(), page_url)?);
        Ok(Self::new(cache, chat, content))
    }

    /// Read-only view of the widget state, for rendering.
    #[must_use]
    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    /// Derived chat lifecycle phase.
    #[must_use]
    pub fn chat_phase(&self) -> ChatPhase {
        self.state.chat_phase()
    }

    /// Whether the credential inputs (provider API key, GitHub token) are
    /// usable. The owner setting doubles as the namespacing gate: until it
    /// is populated there is nothing safe to key the secrets against.
    #[must_use]
    pub fn credentials_enabled(&self) -> bool {
        !self.state.widget_settings.owner.trim().is_empty()
    }

    /// Restore everything the cache knows on mount: settings, code session,
    /// credentials, model selection, the live chat snapshot, and history.
    pub async fn on_mount(&mut self) {
        self.load_widget_settings();
        self.state.username = self.state.widget_settings.owner.clone();
        self.restore_code_session().await;
        self.state.github_token = self.cache.github_token();

        self.restore_selected_model();
        if self.state.selected_provider == ProviderId::OpenRouter {
            self.load_openrouter_models().await;
        }
        self.restore_api_key();
        self.restore_chat_snapshot();
        self.reload_chat_history();

        self.state.meta_prompt = self.cache.meta_prompt();
        self.state.include_meta_prompt = self.cache.include_meta_prompt();

        info!(
            provider = self.state.selected_provider.as_str(),
            model = %self.state.selected_model,
            restored_messages = self.state.messages.len(),
            "widget mounted"
        );
    }

    /// Switch tabs. Content-bearing tabs load their list on first activation
    /// only: a populated or already-loading list is left alone, so repeated
    /// switches never stack requests.
    pub async fn set_active_tab(&mut self, tab: Tab) {
        self.state.active_tab = tab;
        match tab {
            Tab::Content if self.state.posts.is_empty() && !self.state.loading_posts => {
                self.load_posts().await;
            }
            Tab::Code if self.state.repositories.is_empty() && !self.state.loading_repositories => {
                self.load_repositories().await;
            }
            _ => {}
        }
    }

    pub fn toggle_fullscreen(&mut self) {
        self.state.is_fullscreen = !self.state.is_fullscreen;
    }

    pub fn toggle_collapse(&mut self) {
        self.state.is_collapsed = !self.state.is_collapsed;
    }

    pub fn set_current_message(&mut self, text: impl Into<String>) {
        self.state.current_message = text.into();
    }

    pub fn set_focused_message(&mut self, index: isize) {
        self.state.focused_message_index = index;
    }
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
#[path = "widget_test.rs"]
mod tests;
