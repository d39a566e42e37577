//! Remote content discovery.
//!
//! DESIGN
//! ======
//! Two backends feed the attachment pickers: the GitHub REST API (primary)
//! and a sitemap-derived HTML listing (fallback, for sites whose repo is not
//! reachable). Every listing and content call is cache-first: a cache hit
//! short-circuits entirely and no request is issued.
//!
//! The orchestrator talks to the [`ContentSource`] trait so tests can swap
//! the network out; [`WebContentSource`] is the real implementation.

pub mod github;
pub mod sitemap;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::Cache;
use crate::config::WidgetSettings;

pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 60;
pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 10;

const GITHUB_API_BASE_URL: &str = "https://api.github.com";
const RAW_GITHUB_BASE_URL: &str = "https://raw.githubusercontent.com";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by content discovery. The display strings are surfaced to
/// the author verbatim, so rate-limit and not-found cases carry actionable
/// wording instead of bare status codes.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GitHub API rate limit exceeded. Please try again later or use a GitHub token for higher limits.")]
    RateLimited,

    #[error("{0}")]
    NotFound(String),

    #[error("HTTP error! status: {0}")]
    Http(u16),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response from {0}")]
    Malformed(&'static str),

    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

/// Map a git-hosting API status into the error taxonomy. `not_found` supplies
/// the human-readable 404 wording for the operation at hand.
pub(crate) fn map_status(status: u16, not_found: impl FnOnce() -> String) -> FetchError {
    match status {
        403 => FetchError::RateLimited,
        404 => FetchError::NotFound(not_found()),
        other => FetchError::Http(other),
    }
}

// =============================================================================
// DOMAIN TYPES
// =============================================================================

/// Where a posts listing came from. Cache entries for the two sources are
/// independent, each with its own expiry group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSource {
    Github,
    Sitemap,
}

impl PostSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Sitemap => "sitemap",
        }
    }
}

/// One selectable writing sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub url: String,
    pub name: String,
    #[serde(rename = "type")]
    pub post_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lastmod: Option<String>,
    pub path: String,
}

/// One repository of the browsed user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub language: String,
    pub updated_at: String,
    pub default_branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    File,
    Dir,
}

/// One entry of a repository directory listing. Directories are navigable,
/// files are selectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub path: String,
    pub size: u64,
    #[serde(default)]
    pub download_url: Option<String>,
}

// =============================================================================
// CONTENT SOURCE TRAIT
// =============================================================================

/// Network seam for the orchestrator. All listing calls are cache-first in
/// the real implementation; `file_content` degrades to an empty string on
/// failure so a broken attachment never blocks a chat turn.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    /// Primary posts listing (git hosting API).
    async fn list_posts(&self, settings: &WidgetSettings) -> Result<Vec<PostSummary>, FetchError>;

    /// Fallback posts listing (sitemap-derived).
    async fn list_posts_fallback(&self, settings: &WidgetSettings) -> Result<Vec<PostSummary>, FetchError>;

    async fn list_repositories(
        &self,
        username: &str,
        include_forks: bool,
    ) -> Result<Vec<RepoSummary>, FetchError>;

    async fn list_repository_content(
        &self,
        username: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<ContentItem>, FetchError>;

    /// Post body, post-processed per source (markdown passthrough for the
    /// git host, selector extraction for sitemap pages).
    async fn post_content(&self, url: &str, settings: &WidgetSettings) -> Result<String, FetchError>;

    /// Raw file body; empty string on failure.
    async fn file_content(&self, url: &str) -> String;
}

// =============================================================================
// WEB IMPLEMENTATION
// =============================================================================

/// Real [`ContentSource`] over the GitHub API and the site's sitemap.
pub struct WebContentSource {
    pub(crate) http: reqwest::Client,
    pub(crate) cache: Cache,
    pub(crate) page_url: String,
    pub(crate) api_base: String,
    pub(crate) raw_base: String,
}

impl WebContentSource {
    /// Build against the public GitHub endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(cache: Cache, page_url: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            cache,
            page_url: page_url.to_string(),
            api_base: GITHUB_API_BASE_URL.into(),
            raw_base: RAW_GITHUB_BASE_URL.into(),
        })
    }

    /// Override the API and raw-content hosts (tests, GitHub Enterprise).
    #[must_use]
    pub fn with_base_urls(mut self, api_base: impl Into<String>, raw_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.raw_base = raw_base.into();
        self
    }
}

#[async_trait::async_trait]
impl ContentSource for WebContentSource {
    async fn list_posts(&self, settings: &WidgetSettings) -> Result<Vec<PostSummary>, FetchError> {
        github::fetch_posts(self, settings).await
    }

    async fn list_posts_fallback(&self, settings: &WidgetSettings) -> Result<Vec<PostSummary>, FetchError> {
        sitemap::fetch_posts(self, settings).await
    }

    async fn list_repositories(
        &self,
        username: &str,
        include_forks: bool,
    ) -> Result<Vec<RepoSummary>, FetchError> {
        github::fetch_repositories(self, username, include_forks).await
    }

    async fn list_repository_content(
        &self,
        username: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<ContentItem>, FetchError> {
        github::fetch_repository_content(self, username, repo, path).await
    }

    async fn post_content(&self, url: &str, settings: &WidgetSettings) -> Result<String, FetchError> {
        github::fetch_post_content(self, url, settings).await
    }

    async fn file_content(&self, url: &str) -> String {
        github::fetch_file_content(self, url).await
    }
}
