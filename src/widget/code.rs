//! Code tab transitions: repository browsing, path navigation, file
//! selection, and the persisted browsing session.

use tracing::{info, warn};

use super::Widget;
use crate::state::{CodeSession, MAX_SELECTED_CODE_FILES};

impl Widget {
    /// Restore the persisted browsing session, if one survived expiry, and
    /// reload the listing it points at.
    pub(crate) async fn restore_code_session(&mut self) {
        let Some(session) = self.cache.code_session() else {
            return;
        };
        if session.selected_repository.is_empty() {
            return;
        }
        self.state.username = if session.username.is_empty() {
            self.state.widget_settings.owner.clone()
        } else {
            session.username
        };
        self.state.username_edited = session.username_edited;
        self.state.selected_repository = session.selected_repository;
        self.state.current_path = session.current_path;
        self.state.selected_code_files = session.selected_code_files;
        self.state.include_forks = session.include_forks;

        let repository = self.state.selected_repository.clone();
        let path = self.state.current_path.clone();
        self.load_repository_content(&repository, &path).await;
    }

    pub(crate) fn persist_code_session(&self) {
        self.cache.set_code_session(&CodeSession {
            username: self.state.username.clone(),
            selected_repository: self.state.selected_repository.clone(),
            current_path: self.state.current_path.clone(),
            selected_code_files: self.state.selected_code_files.clone(),
            include_forks: self.state.include_forks,
            username_edited: self.state.username_edited,
        });
    }

    pub async fn load_repositories(&mut self) {
        if self.state.loading_repositories {
            return;
        }
        self.state.loading_repositories = true;
        self.state.repositories_error = None;

        let username = self.state.username.clone();
        match self.content.list_repositories(&username, self.state.include_forks).await {
            Ok(repositories) => {
                info!(count = repositories.len(), username = %username, "repositories loaded");
                self.state.repositories = repositories;
                self.state.loading_repositories = false;
            }
            Err(e) => {
                warn!(error = %e, username = %username, "repository load failed");
                self.state.repositories_error = Some(format!("Failed to load repositories: {e}"));
                self.state.loading_repositories = false;
            }
        }
    }

    pub(crate) async fn load_repository_content(&mut self, repository: &str, path: &str) {
        if self.state.loading_repository_content {
            return;
        }
        self.state.loading_repository_content = true;
        self.state.repository_content_error = None;

        let username = self.state.username.clone();
        match self.content.list_repository_content(&username, repository, path).await {
            Ok(content) => {
                self.state.repository_content = content;
                self.state.current_path = path.to_string();
                self.state.loading_repository_content = false;
            }
            Err(e) => {
                warn!(error = %e, repository, path, "repository content load failed");
                self.state.repository_content_error =
                    Some(format!("Failed to load repository content: {e}"));
                self.state.loading_repository_content = false;
            }
        }
    }

    /// Pick a repository: the path cursor, listing, and file selection all
    /// reset, the root listing loads, and the session is persisted.
    pub async fn select_repository(&mut self, repository: &str) {
        self.state.selected_repository = repository.to_string();
        self.state.current_path = String::new();
        self.state.repository_content = Vec::new();
        self.state.selected_code_files = Vec::new();
        if !repository.is_empty() {
            let repository = repository.to_string();
            self.load_repository_content(&repository, "").await;
        }
        self.persist_code_session();
    }

    /// Move the path cursor. Cursor update, listing reload, and session
    /// persistence are one coupled transition; none happens without the
    /// others.
    pub async fn navigate_to_path(&mut self, path: &str) {
        self.state.current_path = path.to_string();
        if !self.state.selected_repository.is_empty() {
            let repository = self.state.selected_repository.clone();
            self.load_repository_content(&repository, path).await;
        }
        self.persist_code_session();
    }

    pub async fn navigate_up(&mut self) {
        if self.state.current_path.is_empty() {
            return;
        }
        let parent = self
            .state
            .current_path
            .rsplit_once('/')
            .map_or(String::new(), |(parent, _)| parent.to_string());
        self.navigate_to_path(&parent).await;
    }

    /// Replace the code-file selection; beyond-cap selections are rejected
    /// whole.
    pub fn set_selected_code_files(&mut self, names: Vec<String>) -> bool {
        if names.len() > MAX_SELECTED_CODE_FILES {
            return false;
        }
        self.state.selected_code_files = names;
        self.persist_code_session();
        true
    }

    /// Edit the browsing username directly. This permanently breaks the
    /// default-follows-owner link (see `update_setting`).
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.state.username = username.into();
        self.state.username_edited = true;
        self.persist_code_session();
    }

    pub fn set_github_token(&mut self, token: impl Into<String>) {
        self.state.github_token = token.into();
        self.cache.set_github_token(&self.state.github_token);
    }

    pub async fn set_include_forks(&mut self, include_forks: bool) {
        self.state.include_forks = include_forks;
        self.persist_code_session();
        self.state.repositories = Vec::new();
        self.load_repositories().await;
    }

    /// Drop the code caches and start the tab over from the network.
    pub async fn refresh_code(&mut self) {
        self.cache.clear_code_caches(&self.state.username);
        self.state.repositories = Vec::new();
        self.state.selected_repository = String::new();
        self.state.current_path = String::new();
        self.state.repository_content = Vec::new();
        self.state.selected_code_files = Vec::new();
        self.load_repositories().await;
    }
}

#[cfg(test)]
#[path = "code_test.rs"]
mod tests;
