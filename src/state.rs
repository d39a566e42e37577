//! Widget state.
//!
//! DESIGN
//! ======
//! `WidgetState` is the single record behind the widget UI. It is created
//! once at mount with defaults and mutated exclusively through the
//! transition methods on `widget::Widget`; the rendering layer reads it and
//! never writes. Serialized shapes here (`Message`, `ChatSession`,
//! `CodeSession`) double as the cache storage format, so field names stay
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::config::WidgetSettings;
use crate::fetch::{ContentItem, PostSummary, RepoSummary};
use crate::llm::types::{ModelDescriptor, Role};
use crate::providers::ProviderId;

/// Selection ceiling for writing-sample posts.
pub const MAX_SELECTED_POSTS: usize = 3;
/// Selection ceiling for code files.
pub const MAX_SELECTED_CODE_FILES: usize = 10;

// =============================================================================
// MESSAGES
// =============================================================================

/// Context attached to an outgoing user turn, kept for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attachments {
    pub meta_prompt: bool,
    pub posts: Vec<String>,
    pub code_files: Vec<String>,
}

impl Attachments {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.meta_prompt && self.posts.is_empty() && self.code_files.is_empty()
    }
}

/// One rendered conversation entry. Append-only while the chat is live,
/// immutable once archived into history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attachments: Option<Attachments>,
}

/// A complete conversation as cached or archived. Identity is `timestamp`,
/// used to dedup entries when restoring from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub total_token_count: u64,
    pub timestamp: i64,
}

/// Persisted provider/model choice, scoped to the content identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedModel {
    #[serde(rename = "selectedProvider")]
    pub provider: ProviderId,
    #[serde(rename = "selectedLLM")]
    pub model: String,
}

/// Persisted code-browsing snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeSession {
    pub username: String,
    pub selected_repository: String,
    pub current_path: String,
    pub selected_code_files: Vec<String>,
    pub include_forks: bool,
    /// Set once the user edits the username directly; from then on the
    /// username no longer follows the `owner` setting.
    pub username_edited: bool,
}

// =============================================================================
// TABS AND PHASES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Chat,
    Content,
    Code,
    Settings,
}

/// Derived chat lifecycle phase; not stored, computed from the state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Empty,
    AwaitingResponse,
    Ready,
    Error,
}

// =============================================================================
// WIDGET STATE
// =============================================================================

/// Every UI-visible field of the widget, in one mutable record.
#[derive(Debug, Clone)]
pub struct WidgetState {
    pub active_tab: Tab,
    pub is_fullscreen: bool,
    pub is_collapsed: bool,

    // chat tab
    pub selected_provider: ProviderId,
    pub selected_model: String,
    pub api_key: String,
    pub api_key_input: String,
    pub show_api_key_section: bool,
    pub messages: Vec<Message>,
    pub current_message: String,
    pub is_loading: bool,
    pub total_token_count: u64,
    pub error: Option<String>,
    pub focused_message_index: isize,
    pub chat_history: Vec<ChatSession>,
    pub openrouter_models: Vec<ModelDescriptor>,

    // posts tab
    pub meta_prompt: String,
    pub include_meta_prompt: bool,
    pub posts: Vec<PostSummary>,
    pub selected_posts: Vec<String>,
    pub loading_posts: bool,
    pub posts_error: Option<String>,

    // code tab
    pub username: String,
    pub username_edited: bool,
    pub github_token: String,
    pub repositories: Vec<RepoSummary>,
    pub selected_repository: String,
    pub current_path: String,
    pub repository_content: Vec<ContentItem>,
    pub selected_code_files: Vec<String>,
    pub loading_repositories: bool,
    pub repositories_error: Option<String>,
    pub loading_repository_content: bool,
    pub repository_content_error: Option<String>,
    pub include_forks: bool,

    // settings tab
    pub widget_settings: WidgetSettings,
}

impl WidgetState {
    #[must_use]
    pub fn new() -> Self {
        let selected_provider = ProviderId::Google;
        let selected_model = selected_provider
            .builtin_models()
            .first()
            .map(|(id, _)| (*id).to_string())
            .unwrap_or_default();
        Self {
            active_tab: Tab::Chat,
            is_fullscreen: false,
            is_collapsed: true,
            selected_provider,
            selected_model,
            api_key: String::new(),
            api_key_input: String::new(),
            show_api_key_section: true,
            messages: Vec::new(),
            current_message: String::new(),
            is_loading: false,
            total_token_count: 0,
            error: None,
            focused_message_index: -1,
            chat_history: Vec::new(),
            openrouter_models: Vec::new(),
            meta_prompt: String::new(),
            include_meta_prompt: true,
            posts: Vec::new(),
            selected_posts: Vec::new(),
            loading_posts: false,
            posts_error: None,
            username: String::new(),
            username_edited: false,
            github_token: String::new(),
            repositories: Vec::new(),
            selected_repository: String::new(),
            current_path: String::new(),
            repository_content: Vec::new(),
            selected_code_files: Vec::new(),
            loading_repositories: false,
            repositories_error: None,
            loading_repository_content: false,
            repository_content_error: None,
            include_forks: false,
            widget_settings: WidgetSettings::default(),
        }
    }

    /// Chat lifecycle phase: Empty -> AwaitingResponse -> Ready, with Error
    /// recoverable on the next send.
    #[must_use]
    pub fn chat_phase(&self) -> ChatPhase {
        if self.is_loading {
            ChatPhase::AwaitingResponse
        } else if self.error.is_some() {
            ChatPhase::Error
        } else if self.messages.is_empty() {
            ChatPhase::Empty
        } else {
            ChatPhase::Ready
        }
    }
}

impl Default for WidgetState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
