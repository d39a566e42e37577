//! Typed cache over the host key-value store.
//!
//! DESIGN
//! ======
//! The host store is a flat string namespace with no transactions, so this
//! layer owns three conventions on top of it:
//!
//! - key prefixes per resource, with prefix-scan clears;
//! - a single side table of per-resource-group timestamps (one "last
//!   written" entry validates a whole family of derived keys — the posts
//!   list timestamp covers every cached post body fetched under it);
//! - content-addressed keys for arbitrary strings (URLs, paths), built by
//!   base64-encoding and stripping non-alphanumerics. Two distinct inputs
//!   can alias after stripping; accepted as a known limitation.
//!
//! ERROR HANDLING
//! ==============
//! Every operation is total. Unreadable or unparsable data is a cache miss,
//! a refused write is a no-op, and a missing timestamp means expired. Cache
//! faults must never block the chat or browse workflows.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::config::WidgetSettings;
use crate::fetch::{ContentItem, PostSource, PostSummary, RepoSummary};
use crate::kv::KeyValueStore;
use crate::llm::types::ModelDescriptor;
use crate::providers::ProviderId;
use crate::state::{ChatSession, CodeSession, Message, SelectedModel};

const CACHE_EXPIRY_HOURS: i64 = 24;
const MAX_HISTORY_ITEMS: usize = 20;

mod keys {
    pub const WIDGET_SETTINGS: &str = "ai_chat_widget_settings";
    pub const TIMESTAMPS: &str = "ai_chat_timestamps";
    pub const SELECTED_MODEL: &str = "ai_chat_selected_model_";
    pub const API_KEYS: &str = "ai_chat_api_keys";
    pub const OPENROUTER_MODELS: &str = "ai_chat_openrouter_models";
    pub const GITHUB_TOKEN: &str = "ai_chat_github_token";
    pub const POSTS_LIST: &str = "ai_chat_posts_list_";
    pub const POST_CONTENT: &str = "ai_chat_post_content_";
    pub const CHAT_RESPONSES: &str = "ai_chat_responses_";
    pub const CHAT_HISTORY: &str = "ai_chat_history_";
    pub const META_PROMPT: &str = "ai_chat_meta_prompt";
    pub const INCLUDE_META_PROMPT: &str = "ai_chat_include_meta_prompt";
    pub const REPOSITORIES_LIST: &str = "ai_chat_repositories_list_";
    pub const REPOSITORY_CONTENT: &str = "ai_chat_repository_content_";
    pub const CODE_SESSION: &str = "ai_chat_code_settings_cache_";
}

mod time_ids {
    pub const POSTS: &str = "posts_";
    pub const REPOSITORIES: &str = "repositories_";
    pub const CODE_SESSION: &str = "code_settings";
    pub const OPENROUTER_MODELS: &str = "openrouter_models";
}

/// Milliseconds since the Unix epoch, 0 on clock failure.
#[must_use]
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Stable, collision-tolerant key fragment for an arbitrary string.
///
/// Base64-encodes the input, then strips every non-alphanumeric character.
/// Distinct inputs whose encodings differ only in stripped characters will
/// alias; callers accept that as a cache-correctness (not data-correctness)
/// risk.
#[must_use]
pub(crate) fn encode_key(raw: &str) -> String {
    STANDARD
        .encode(raw)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Content identity of the page the widget is mounted on: the entry slug of
/// a `/entries/<slug>/index` page URL, if present.
#[must_use]
pub(crate) fn content_key_from_url(page_url: &str) -> Option<String> {
    let (_, rest) = page_url.split_once("/entries/")?;
    let (slug, tail) = rest.split_once('/')?;
    if slug.is_empty() || !tail.starts_with("index") {
        return None;
    }
    Some(slug.to_string())
}

// =============================================================================
// CACHE HANDLE
// =============================================================================

/// Cheap-clone typed accessor over the host store.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
    content_key: Option<String>,
}

impl Cache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, page_url: &str) -> Self {
        Self { store, content_key: content_key_from_url(page_url) }
    }

    /// The content identity this widget instance is scoped to, if the page
    /// URL carried one. Chat snapshots, history, and the selected model are
    /// all keyed under it; without it those accessors are inert.
    #[must_use]
    pub fn content_key(&self) -> Option<&str> {
        self.content_key.as_deref()
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "cache: discarding unreadable entry");
                None
            }
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => {
                if !self.store.set(key, &raw) {
                    warn!(key, "cache: store refused write");
                }
            }
            Err(e) => warn!(key, error = %e, "cache: failed to serialize entry"),
        }
    }

    fn remove_prefixed(&self, prefixes: &[&str]) {
        for key in self.store.keys() {
            if prefixes.iter().any(|p| key.starts_with(p)) {
                self.store.remove(&key);
            }
        }
    }

    // =========================================================================
    // EXPIRY TABLE
    // =========================================================================

    /// Whether a resource group's last write is older than the 24h budget.
    /// Missing table, missing entry, or unparsable value all read as expired
    /// so the caller refetches.
    #[must_use]
    pub fn is_expired(&self, timestamp_id: &str) -> bool {
        let table: Option<BTreeMap<String, String>> = self.get_json(keys::TIMESTAMPS);
        let Some(written_at) = table.and_then(|t| t.get(timestamp_id).and_then(|v| v.parse::<i64>().ok()))
        else {
            return true;
        };
        let hours = (now_ms() - written_at) / (1000 * 60 * 60);
        hours >= CACHE_EXPIRY_HOURS
    }

    /// Record "now" as a resource group's last write.
    pub fn touch(&self, timestamp_id: &str) {
        let mut table: BTreeMap<String, String> = self.get_json(keys::TIMESTAMPS).unwrap_or_default();
        table.insert(timestamp_id.to_string(), now_ms().to_string());
        self.set_json(keys::TIMESTAMPS, &table);
    }

    fn clear_timestamp(&self, timestamp_id: &str) {
        let mut table: BTreeMap<String, String> = self.get_json(keys::TIMESTAMPS).unwrap_or_default();
        table.remove(timestamp_id);
        self.set_json(keys::TIMESTAMPS, &table);
    }

    fn posts_time_id(source: PostSource) -> String {
        format!("{}{}", time_ids::POSTS, source.as_str())
    }

    fn repositories_time_id(username: &str, include_forks: bool) -> String {
        let repo_type = if include_forks { "all" } else { "owner" };
        format!("{}{username}_{repo_type}", time_ids::REPOSITORIES)
    }

    // =========================================================================
    // SETTINGS AND CREDENTIALS
    // =========================================================================

    #[must_use]
    pub fn widget_settings(&self) -> Option<WidgetSettings> {
        self.get_json(keys::WIDGET_SETTINGS)
    }

    pub fn set_widget_settings(&self, settings: &WidgetSettings) {
        self.set_json(keys::WIDGET_SETTINGS, settings);
    }

    #[must_use]
    pub fn api_key(&self, provider: ProviderId) -> Option<String> {
        let map: BTreeMap<String, String> = self.get_json(keys::API_KEYS)?;
        map.get(provider.as_str()).cloned()
    }

    pub fn set_api_key(&self, provider: ProviderId, api_key: &str) {
        let mut map: BTreeMap<String, String> = self.get_json(keys::API_KEYS).unwrap_or_default();
        map.insert(provider.as_str().to_string(), api_key.to_string());
        self.set_json(keys::API_KEYS, &map);
    }

    #[must_use]
    pub fn github_token(&self) -> String {
        self.store.get(keys::GITHUB_TOKEN).unwrap_or_default()
    }

    pub fn set_github_token(&self, token: &str) {
        if !self.store.set(keys::GITHUB_TOKEN, token) {
            warn!("cache: store refused github token write");
        }
    }

    #[must_use]
    pub fn meta_prompt(&self) -> String {
        self.store.get(keys::META_PROMPT).unwrap_or_default()
    }

    pub fn set_meta_prompt(&self, meta_prompt: &str) {
        if !self.store.set(keys::META_PROMPT, meta_prompt) {
            warn!("cache: store refused meta prompt write");
        }
    }

    /// Defaults to `true` when never stored.
    #[must_use]
    pub fn include_meta_prompt(&self) -> bool {
        match self.store.get(keys::INCLUDE_META_PROMPT) {
            None => true,
            Some(raw) => raw == "true",
        }
    }

    pub fn set_include_meta_prompt(&self, include: bool) {
        let raw = if include { "true" } else { "false" };
        if !self.store.set(keys::INCLUDE_META_PROMPT, raw) {
            warn!("cache: store refused meta prompt flag write");
        }
    }

    // =========================================================================
    // MODEL CATALOG AND SELECTION
    // =========================================================================

    #[must_use]
    pub fn openrouter_models(&self) -> Option<Vec<ModelDescriptor>> {
        if self.is_expired(time_ids::OPENROUTER_MODELS) {
            return None;
        }
        self.get_json(keys::OPENROUTER_MODELS)
    }

    pub fn set_openrouter_models(&self, models: &[ModelDescriptor]) {
        self.set_json(keys::OPENROUTER_MODELS, &models);
        self.touch(time_ids::OPENROUTER_MODELS);
    }

    #[must_use]
    pub fn selected_model(&self) -> Option<SelectedModel> {
        let key = format!("{}{}", keys::SELECTED_MODEL, self.content_key()?);
        self.get_json(&key)
    }

    pub fn set_selected_model(&self, selection: &SelectedModel) {
        let Some(content_key) = self.content_key() else {
            return;
        };
        let key = format!("{}{content_key}", keys::SELECTED_MODEL);
        self.set_json(&key, selection);
    }

    // =========================================================================
    // POSTS
    // =========================================================================

    #[must_use]
    pub fn posts(&self, source: PostSource) -> Option<Vec<PostSummary>> {
        if self.is_expired(&Self::posts_time_id(source)) {
            return None;
        }
        self.get_json(&format!("{}{}", keys::POSTS_LIST, source.as_str()))
    }

    pub fn set_posts(&self, posts: &[PostSummary], source: PostSource) {
        self.set_json(&format!("{}{}", keys::POSTS_LIST, source.as_str()), &posts);
        self.touch(&Self::posts_time_id(source));
    }

    fn post_content_key(url: &str, source: PostSource) -> String {
        format!("{}{}_{}", keys::POST_CONTENT, source.as_str(), encode_key(url))
    }

    /// Valid only while the parent posts list for `source` is unexpired;
    /// per-URL entries carry no timestamp of their own.
    #[must_use]
    pub fn post_content(&self, url: &str, source: PostSource) -> Option<String> {
        if self.is_expired(&Self::posts_time_id(source)) {
            return None;
        }
        self.get_json(&Self::post_content_key(url, source))
    }

    pub fn set_post_content(&self, url: &str, source: PostSource, content: &str) {
        self.set_json(&Self::post_content_key(url, source), &content);
    }

    pub fn clear_posts_caches(&self) {
        self.remove_prefixed(&[keys::POSTS_LIST, keys::POST_CONTENT]);
        self.clear_timestamp(&Self::posts_time_id(PostSource::Github));
        self.clear_timestamp(&Self::posts_time_id(PostSource::Sitemap));
    }

    // =========================================================================
    // REPOSITORIES AND CODE
    // =========================================================================

    #[must_use]
    pub fn repositories(&self, username: &str, include_forks: bool) -> Option<Vec<RepoSummary>> {
        if self.is_expired(&Self::repositories_time_id(username, include_forks)) {
            return None;
        }
        let repo_type = if include_forks { "all" } else { "owner" };
        self.get_json(&format!("{}{username}_{repo_type}", keys::REPOSITORIES_LIST))
    }

    pub fn set_repositories(&self, username: &str, repositories: &[RepoSummary], include_forks: bool) {
        let repo_type = if include_forks { "all" } else { "owner" };
        self.set_json(&format!("{}{username}_{repo_type}", keys::REPOSITORIES_LIST), &repositories);
        self.touch(&Self::repositories_time_id(username, include_forks));
    }

    fn repository_content_key(username: &str, repo: &str, path: &str) -> String {
        format!("{}{username}_{repo}_{}", keys::REPOSITORY_CONTENT, encode_key(path))
    }

    /// Valid while either of the user's repository lists (with or without
    /// forks) is unexpired — the fork flag isn't known at read time.
    #[must_use]
    pub fn repository_content(&self, username: &str, repo: &str, path: &str) -> Option<Vec<ContentItem>> {
        if self.is_expired(&Self::repositories_time_id(username, true))
            && self.is_expired(&Self::repositories_time_id(username, false))
        {
            return None;
        }
        self.get_json(&Self::repository_content_key(username, repo, path))
    }

    pub fn set_repository_content(&self, username: &str, repo: &str, path: &str, content: &[ContentItem]) {
        self.set_json(&Self::repository_content_key(username, repo, path), &content);
    }

    #[must_use]
    pub fn code_session(&self) -> Option<CodeSession> {
        if self.is_expired(time_ids::CODE_SESSION) {
            return None;
        }
        self.get_json(keys::CODE_SESSION)
    }

    pub fn set_code_session(&self, session: &CodeSession) {
        self.set_json(keys::CODE_SESSION, session);
        self.touch(time_ids::CODE_SESSION);
    }

    pub fn clear_code_caches(&self, username: &str) {
        self.remove_prefixed(&[keys::REPOSITORIES_LIST, keys::REPOSITORY_CONTENT, keys::CODE_SESSION]);
        self.clear_timestamp(time_ids::CODE_SESSION);
        self.clear_timestamp(&Self::repositories_time_id(username, true));
        self.clear_timestamp(&Self::repositories_time_id(username, false));
    }

    // =========================================================================
    // CHAT SNAPSHOT AND HISTORY
    // =========================================================================

    fn chat_bucket(&self, provider: ProviderId, model: &str) -> Option<String> {
        let content_key = self.content_key()?;
        Some(format!("{}_{model}_{content_key}", provider.as_str()))
    }

    #[must_use]
    pub fn chat_snapshot(&self, provider: ProviderId, model: &str) -> Option<ChatSession> {
        let key = format!("{}{}", keys::CHAT_RESPONSES, self.chat_bucket(provider, model)?);
        self.get_json(&key)
    }

    pub fn set_chat_snapshot(&self, provider: ProviderId, model: &str, messages: &[Message], total_token_count: u64) {
        let Some(bucket) = self.chat_bucket(provider, model) else {
            return;
        };
        let session =
            ChatSession { messages: messages.to_vec(), total_token_count, timestamp: now_ms() };
        self.set_json(&format!("{}{bucket}", keys::CHAT_RESPONSES), &session);
    }

    pub fn clear_chat_snapshot(&self, provider: ProviderId, model: &str) {
        if let Some(bucket) = self.chat_bucket(provider, model) {
            self.store.remove(&format!("{}{bucket}", keys::CHAT_RESPONSES));
        }
    }

    #[must_use]
    pub fn chat_history(&self, provider: ProviderId, model: &str) -> Vec<ChatSession> {
        let Some(bucket) = self.chat_bucket(provider, model) else {
            return Vec::new();
        };
        self.get_json(&format!("{}{bucket}", keys::CHAT_HISTORY)).unwrap_or_default()
    }

    pub fn set_chat_history(&self, provider: ProviderId, model: &str, history: &[ChatSession]) {
        let Some(bucket) = self.chat_bucket(provider, model) else {
            return;
        };
        self.set_json(&format!("{}{bucket}", keys::CHAT_HISTORY), &history);
    }

    /// Head-insert a session into the bucket's history, evicting past the
    /// 20-entry cap. Empty sessions are not archived.
    pub fn add_chat_to_history(&self, provider: ProviderId, model: &str, session: ChatSession) {
        if session.messages.is_empty() {
            return;
        }
        let mut history = self.chat_history(provider, model);
        history.insert(0, session);
        history.truncate(MAX_HISTORY_ITEMS);
        self.set_chat_history(provider, model, &history);
    }

    pub fn clear_chat_history(&self, provider: ProviderId, model: &str) {
        if let Some(bucket) = self.chat_bucket(provider, model) {
            self.store.remove(&format!("{}{bucket}", keys::CHAT_HISTORY));
        }
    }

    /// Wipe every chat snapshot and history bucket across all content
    /// identities.
    pub fn clear_all_chat_caches(&self) {
        self.remove_prefixed(&[keys::CHAT_RESPONSES, keys::CHAT_HISTORY]);
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
