//! Chat transitions: provider/model/key selection, the send sequence, and
//! history archival.

use std::fmt::Write as _;

use futures::future::join_all;
use tracing::{info, warn};

use super::Widget;
use crate::cache::now_ms;
use crate::fetch::{ContentItem, PostSummary};
use crate::llm::types::{ChatMessage, Role};
use crate::providers::{self, ProviderId};
use crate::state::{Attachments, ChatSession, Message, SelectedModel};

const API_KEY_MISSING: &str = "API key is not set. Confirm an API key to start chatting.";

impl Widget {
    // =========================================================================
    // PROVIDER / MODEL / KEY
    // =========================================================================

    /// Select a provider: re-derive the default model, then swing the API
    /// key, live chat snapshot, and history over to the new bucket.
    pub async fn set_provider(&mut self, provider: ProviderId) {
        self.state.selected_provider = provider;
        if provider == ProviderId::OpenRouter {
            self.load_openrouter_models().await;
        }
        let pick = providers::model_or_default(provider, &self.state.selected_model, &self.state.openrouter_models);
        self.state.selected_model = pick.id;
        self.persist_selected_model();
        self.restore_api_key();
        self.restore_chat_snapshot();
        self.reload_chat_history();
    }

    /// Select a model within the current provider; the chat snapshot and
    /// history are per provider+model, so both reload.
    pub fn set_model(&mut self, model: &str) {
        self.state.selected_model = model.to_string();
        self.persist_selected_model();
        self.restore_chat_snapshot();
        self.reload_chat_history();
    }

    fn persist_selected_model(&self) {
        self.cache.set_selected_model(&SelectedModel {
            provider: self.state.selected_provider,
            model: self.state.selected_model.clone(),
        });
    }

    pub(crate) fn restore_selected_model(&mut self) {
        if let Some(selection) = self.cache.selected_model() {
            self.state.selected_provider = selection.provider;
            self.state.selected_model = selection.model;
        }
    }

    /// Pull the stored API key for the current provider into state, or reset
    /// to the key-entry view when none is stored.
    pub(crate) fn restore_api_key(&mut self) {
        match self.cache.api_key(self.state.selected_provider).filter(|k| !k.is_empty()) {
            Some(key) => {
                self.state.api_key_input = key.clone();
                self.state.api_key = key;
                self.state.show_api_key_section = false;
            }
            None => {
                self.state.api_key = String::new();
                self.state.api_key_input = String::new();
                self.state.show_api_key_section = true;
            }
        }
    }

    pub fn set_api_key_input(&mut self, text: impl Into<String>) {
        self.state.api_key_input = text.into();
    }

    /// Commit the pending key for the current provider and collapse the
    /// key-entry section.
    pub fn confirm_api_key(&mut self) {
        let key = self.state.api_key_input.trim().to_string();
        if key.is_empty() {
            return;
        }
        self.cache.set_api_key(self.state.selected_provider, &key);
        self.state.api_key = key;
        self.state.show_api_key_section = false;
    }

    pub fn show_api_key_entry(&mut self) {
        self.state.show_api_key_section = true;
    }

    /// OpenRouter's catalog is dynamic: cache-first, then one network fetch.
    /// Failures are logged and leave the previous (possibly empty) catalog;
    /// the chat path does not depend on this call.
    pub async fn load_openrouter_models(&mut self) {
        if let Some(models) = self.cache.openrouter_models() {
            self.state.openrouter_models = models;
            return;
        }
        match self.chat.list_models(ProviderId::OpenRouter).await {
            Ok(models) => {
                self.cache.set_openrouter_models(&models);
                self.state.openrouter_models = models;
            }
            Err(e) => warn!(error = %e, "failed to load OpenRouter models"),
        }
    }

    // =========================================================================
    // SNAPSHOT AND HISTORY PLUMBING
    // =========================================================================

    pub(crate) fn restore_chat_snapshot(&mut self) {
        match self.cache.chat_snapshot(self.state.selected_provider, &self.state.selected_model) {
            Some(session) => {
                self.state.focused_message_index = session.messages.len() as isize;
                self.state.messages = session.messages;
                self.state.total_token_count = session.total_token_count;
            }
            None => {
                self.state.messages = Vec::new();
                self.state.total_token_count = 0;
                self.state.focused_message_index = -1;
            }
        }
    }

    pub(crate) fn reload_chat_history(&mut self) {
        self.state.chat_history =
            self.cache.chat_history(self.state.selected_provider, &self.state.selected_model);
    }

    /// Archive the live conversation into its history bucket. Empty
    /// conversations are not archived; identity is the last turn's timestamp.
    fn archive_current(&mut self) {
        if self.state.messages.is_empty() {
            return;
        }
        let timestamp = self
            .state
            .messages
            .last()
            .and_then(|m| m.timestamp)
            .unwrap_or_else(now_ms);
        let session = ChatSession {
            messages: self.state.messages.clone(),
            total_token_count: self.state.total_token_count,
            timestamp,
        };
        self.cache
            .add_chat_to_history(self.state.selected_provider, &self.state.selected_model, session);
    }

    /// Archive the live conversation (if any) and start fresh.
    pub fn new_chat(&mut self) {
        self.archive_current();
        self.cache
            .clear_chat_snapshot(self.state.selected_provider, &self.state.selected_model);
        self.state.messages = Vec::new();
        self.state.total_token_count = 0;
        self.state.focused_message_index = -1;
        self.state.error = None;
        self.reload_chat_history();
    }

    /// Move a history entry (by timestamp identity) into the live slot. The
    /// current conversation is archived first; the restored entry leaves the
    /// history list so it cannot be restored into a duplicate.
    pub fn restore_chat(&mut self, timestamp: i64) {
        let Some(entry) = self
            .state
            .chat_history
            .iter()
            .find(|s| s.timestamp == timestamp)
            .cloned()
        else {
            return;
        };

        self.new_chat();

        let provider = self.state.selected_provider;
        let model = self.state.selected_model.clone();
        self.cache
            .set_chat_snapshot(provider, &model, &entry.messages, entry.total_token_count);
        self.state.focused_message_index = entry.messages.len() as isize;
        self.state.messages = entry.messages;
        self.state.total_token_count = entry.total_token_count;

        let remaining: Vec<ChatSession> = self
            .cache
            .chat_history(provider, &model)
            .into_iter()
            .filter(|s| s.timestamp != timestamp)
            .collect();
        self.cache.set_chat_history(provider, &model, &remaining);
        self.reload_chat_history();
    }

    /// Drop one archived conversation.
    pub fn delete_chat(&mut self, timestamp: i64) {
        let provider = self.state.selected_provider;
        let model = self.state.selected_model.clone();
        let remaining: Vec<ChatSession> = self
            .cache
            .chat_history(provider, &model)
            .into_iter()
            .filter(|s| s.timestamp != timestamp)
            .collect();
        self.cache.set_chat_history(provider, &model, &remaining);
        self.reload_chat_history();
    }

    /// Erase the current bucket's history.
    pub fn clear_history(&mut self) {
        self.cache
            .clear_chat_history(self.state.selected_provider, &self.state.selected_model);
        self.reload_chat_history();
    }

    /// Erase every chat snapshot and history bucket, plus the live chat.
    pub fn clear_all_history(&mut self) {
        self.cache.clear_all_chat_caches();
        self.state.messages = Vec::new();
        self.state.total_token_count = 0;
        self.state.focused_message_index = -1;
        self.state.chat_history = Vec::new();
    }

    // =========================================================================
    // SEND SEQUENCE
    // =========================================================================

    /// Send the draft message.
    ///
    /// Order of operations: resolve attachment context (meta-prompt, writing
    /// samples, code samples — in that order, fetched concurrently, joined
    /// before composing), append the user turn optimistically, call the
    /// provider, then either append the reply and persist the snapshot or
    /// surface the error without losing anything already in state.
    pub async fn send_current_message(&mut self) {
        if self.state.is_loading {
            return;
        }
        let text = self.state.current_message.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.state.api_key.is_empty() {
            self.state.error = Some(API_KEY_MISSING.into());
            return;
        }

        let (context, attachments) = self.assemble_context().await;
        let provider = self.state.selected_provider;
        let model = self.state.selected_model.clone();

        let mut outgoing: Vec<ChatMessage> = self
            .state
            .messages
            .iter()
            .map(|m| ChatMessage { role: m.role, content: m.content.clone() })
            .collect();
        outgoing.push(ChatMessage::user(format!("{context}{text}")));

        self.state.messages.push(Message {
            role: Role::User,
            content: text,
            timestamp: Some(now_ms()),
            attachments: if attachments.is_empty() { None } else { Some(attachments) },
        });
        self.state.current_message.clear();
        self.state.error = None;
        self.state.is_loading = true;

        info!(
            provider = provider.as_str(),
            model = %model,
            turns = outgoing.len(),
            "chat: sending"
        );
        let result = self.chat.send_chat(&self.state.api_key, provider, &model, &outgoing).await;
        self.state.is_loading = false;

        match result {
            Ok(reply) => {
                info!(tokens = reply.total_token_count, "chat: reply received");
                self.state.messages.push(Message {
                    role: Role::Assistant,
                    content: reply.assistant_message,
                    timestamp: Some(now_ms()),
                    attachments: None,
                });
                self.state.total_token_count =
                    self.state.total_token_count.saturating_add(reply.total_token_count);
                self.state.focused_message_index = self.state.messages.len() as isize - 1;
                self.cache.set_chat_snapshot(
                    provider,
                    &model,
                    &self.state.messages,
                    self.state.total_token_count,
                );
            }
            Err(e) => {
                warn!(error = %e, "chat: send failed");
                self.state.error = Some(e.to_string());
            }
        }
    }

    /// Build the context block preceding the user's text: meta-prompt (first
    /// turn only), selected writing samples, then selected code files.
    /// Attachment bodies resolve concurrently; empty bodies are filtered.
    async fn assemble_context(&self) -> (String, Attachments) {
        let mut attachments = Attachments::default();
        let mut context = String::new();

        if self.state.include_meta_prompt
            && !self.state.meta_prompt.is_empty()
            && self.state.messages.is_empty()
        {
            let _ = write!(context, "{}\n\n", self.state.meta_prompt);
            attachments.meta_prompt = true;
        }

        let selected_posts: Vec<PostSummary> = self
            .state
            .posts
            .iter()
            .filter(|p| self.state.selected_posts.contains(&p.name))
            .cloned()
            .collect();
        let selected_files: Vec<ContentItem> = if self.state.selected_repository.is_empty() {
            Vec::new()
        } else {
            self.state
                .repository_content
                .iter()
                .filter(|item| self.state.selected_code_files.contains(&item.name))
                .cloned()
                .collect()
        };

        let settings = self.state.widget_settings.clone();
        let post_fetches = join_all(selected_posts.iter().map(|post| {
            let content = std::sync::Arc::clone(&self.content);
            let settings = settings.clone();
            let url = post.url.clone();
            async move {
                match content.post_content(&url, &settings).await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(url = %url, error = %e, "writing sample fetch failed");
                        String::new()
                    }
                }
            }
        }));
        let file_fetches = join_all(selected_files.iter().map(|item| {
            let content = std::sync::Arc::clone(&self.content);
            let url = item.download_url.clone().unwrap_or_default();
            async move {
                if url.is_empty() { String::new() } else { content.file_content(&url).await }
            }
        }));
        let (post_bodies, file_bodies) = futures::join!(post_fetches, file_fetches);

        if !selected_posts.is_empty() {
            attachments.posts = selected_posts.iter().map(|p| p.name.clone()).collect();
            context.push_str("Here are some examples of my writing style from previous content:\n\n");
            for (post, body) in selected_posts.iter().zip(&post_bodies) {
                if body.is_empty() {
                    continue;
                }
                let _ = write!(context, "<writing-sample>\n{}\n```{body}\n```\n</writing-sample>\n\n", post.name);
            }
        }

        if !selected_files.is_empty() {
            let repo = &self.state.selected_repository;
            attachments.code_files = selected_files
                .iter()
                .map(|f| format!("{repo}/{}", f.path))
                .collect();
            let _ = write!(context, "Here are some files from the {repo} repo:\n\n");
            for (item, body) in selected_files.iter().zip(&file_bodies) {
                if body.is_empty() {
                    continue;
                }
                let _ = write!(
                    context,
                    "<code-sample>\n{} ({repo}/{})\n```{}\n{body}\n```\n</code-sample>\n\n",
                    item.name,
                    item.path,
                    file_extension(&item.name)
                );
            }
        }

        (context, attachments)
    }
}

fn file_extension(file_name: &str) -> &str {
    file_name.rsplit_once('.').map_or("text", |(_, ext)| ext)
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
