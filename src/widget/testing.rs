//! Mock network seams and fixtures for orchestrator tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::cache::Cache;
use crate::config::WidgetSettings;
use crate::fetch::{ContentItem, ContentSource, FetchError, PostSummary, RepoSummary};
use crate::kv::MemoryStore;
use crate::llm::types::{ChatApi, ChatError, ChatMessage, ChatReply, ModelDescriptor};
use crate::providers::ProviderId;
use crate::widget::Widget;

pub(crate) const PAGE_URL: &str = "https://example.com/admin/entries/ai-block-plan/index";

// =============================================================================
// MockChat
// =============================================================================

#[derive(Debug, Clone)]
pub(crate) struct SentRequest {
    pub api_key: String,
    pub provider: ProviderId,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

pub(crate) struct MockChat {
    replies: Mutex<VecDeque<Result<ChatReply, ChatError>>>,
    models: Mutex<Vec<ModelDescriptor>>,
    requests: Mutex<Vec<SentRequest>>,
}

impl MockChat {
    pub fn new() -> Arc<Self> {
        Self::with_replies(Vec::new())
    }

    /// Replies are consumed in order; when the queue runs dry every call
    /// succeeds with a stub reply.
    pub fn with_replies(replies: Vec<Result<ChatReply, ChatError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            models: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_models(&self, models: Vec<ModelDescriptor>) {
        *self.models.lock().unwrap() = models;
    }

    pub fn requests(&self) -> Vec<SentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatApi for MockChat {
    async fn send_chat(
        &self,
        api_key: &str,
        provider: ProviderId,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatReply, ChatError> {
        self.requests.lock().unwrap().push(SentRequest {
            api_key: api_key.to_string(),
            provider,
            model: model.to_string(),
            messages: messages.to_vec(),
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok(ChatReply { assistant_message: "done".into(), total_token_count: 0 }),
        }
    }

    async fn list_models(&self, _provider: ProviderId) -> Result<Vec<ModelDescriptor>, ChatError> {
        Ok(self.models.lock().unwrap().clone())
    }
}

// =============================================================================
// MockContent
// =============================================================================

/// Scriptable [`ContentSource`]: queued results per listing call, body maps
/// for content fetches, and a call log for re-entrancy assertions.
#[derive(Default)]
pub(crate) struct MockContent {
    posts: Mutex<VecDeque<Result<Vec<PostSummary>, FetchError>>>,
    fallback: Mutex<VecDeque<Result<Vec<PostSummary>, FetchError>>>,
    repositories: Mutex<VecDeque<Result<Vec<RepoSummary>, FetchError>>>,
    listings: Mutex<VecDeque<Result<Vec<ContentItem>, FetchError>>>,
    pub post_bodies: Mutex<BTreeMap<String, String>>,
    pub file_bodies: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockContent {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_posts(&self, result: Result<Vec<PostSummary>, FetchError>) {
        self.posts.lock().unwrap().push_back(result);
    }

    pub fn push_fallback(&self, result: Result<Vec<PostSummary>, FetchError>) {
        self.fallback.lock().unwrap().push_back(result);
    }

    pub fn push_repositories(&self, result: Result<Vec<RepoSummary>, FetchError>) {
        self.repositories.lock().unwrap().push_back(result);
    }

    pub fn push_listing(&self, result: Result<Vec<ContentItem>, FetchError>) {
        self.listings.lock().unwrap().push_back(result);
    }

    pub fn set_post_body(&self, url: &str, body: &str) {
        self.post_bodies.lock().unwrap().insert(url.into(), body.into());
    }

    pub fn set_file_body(&self, url: &str, body: &str) {
        self.file_bodies.lock().unwrap().insert(url.into(), body.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait::async_trait]
impl ContentSource for MockContent {
    async fn list_posts(&self, _settings: &WidgetSettings) -> Result<Vec<PostSummary>, FetchError> {
        self.record("posts");
        self.posts.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn list_posts_fallback(&self, _settings: &WidgetSettings) -> Result<Vec<PostSummary>, FetchError> {
        self.record("fallback");
        self.fallback.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn list_repositories(
        &self,
        username: &str,
        _include_forks: bool,
    ) -> Result<Vec<RepoSummary>, FetchError> {
        self.record(format!("repositories:{username}"));
        self.repositories.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn list_repository_content(
        &self,
        _username: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<ContentItem>, FetchError> {
        self.record(format!("content:{repo}:{path}"));
        self.listings.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn post_content(&self, url: &str, _settings: &WidgetSettings) -> Result<String, FetchError> {
        self.record(format!("post:{url}"));
        Ok(self.post_bodies.lock().unwrap().get(url).cloned().unwrap_or_default())
    }

    async fn file_content(&self, url: &str) -> String {
        self.record(format!("file:{url}"));
        self.file_bodies.lock().unwrap().get(url).cloned().unwrap_or_default()
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub(crate) struct Harness {
    pub widget: Widget,
    pub chat: Arc<MockChat>,
    pub content: Arc<MockContent>,
    pub cache: Cache,
}

/// Widget over fresh mocks and an in-memory store.
pub(crate) fn harness() -> Harness {
    harness_with_chat(MockChat::new())
}

pub(crate) fn harness_with_chat(chat: Arc<MockChat>) -> Harness {
    let cache = Cache::new(Arc::new(MemoryStore::new()), PAGE_URL);
    let content = MockContent::new();
    let widget = Widget::new(cache.clone(), chat.clone(), content.clone());
    Harness { widget, chat, content, cache }
}

/// Shortcut: confirmed API key so sends go through.
pub(crate) fn harness_ready(chat: Arc<MockChat>) -> Harness {
    let mut h = harness_with_chat(chat);
    h.widget.set_api_key_input("sk-test");
    h.widget.confirm_api_key();
    h
}
