//! GitHub REST API fetchers.
//!
//! Listings come from the contents and repos endpoints; file bodies come
//! from the raw host unless a token is configured, in which case they route
//! through the authenticated contents API (raw URLs 404 for private
//! repositories). Parsing is pure and separated from transport.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    ContentItem, ContentKind, FetchError, PostSource, PostSummary, RepoSummary, WebContentSource, map_status,
};
use crate::config::WidgetSettings;

// =============================================================================
// TRANSPORT
// =============================================================================

/// GET with GitHub headers (API version accept, token when configured).
/// Returns status + body; status mapping is the caller's business.
async fn github_get(src: &WebContentSource, url: &str) -> Result<(u16, String), FetchError> {
    let mut request = src
        .http
        .get(url)
        .header("Accept", "application/vnd.github.v3+json");
    let token = src.cache.github_token();
    if !token.is_empty() {
        request = request.header("Authorization", format!("token {token}"));
    }
    let response = request
        .send()
        .await
        .map_err(|e| FetchError::Request(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Request(e.to_string()))?;
    Ok((status, body))
}

/// Plain GET with no headers, for raw/public content.
pub(crate) async fn plain_get(src: &WebContentSource, url: &str) -> Result<(u16, String), FetchError> {
    let response = src
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Request(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Request(e.to_string()))?;
    Ok((status, body))
}

fn parse_json(body: &str) -> Result<Value, FetchError> {
    serde_json::from_str(body).map_err(|_| FetchError::Malformed("GitHub API"))
}

// =============================================================================
// POSTS
// =============================================================================

/// List posts from the content repository: one directory listing per
/// configured post type, fanned out concurrently and flattened. Any single
/// listing failure fails the whole call so the orchestrator can fall back.
pub(crate) async fn fetch_posts(
    src: &WebContentSource,
    settings: &WidgetSettings,
) -> Result<Vec<PostSummary>, FetchError> {
    if let Some(posts) = src.cache.posts(PostSource::Github) {
        debug!(count = posts.len(), "posts: cache hit");
        return Ok(posts);
    }

    let fetches = settings.post_types.iter().map(|post_type| async move {
        let url = format!(
            "{}/repos/{}/{}/contents/{}/{}?ref={}",
            src.api_base, settings.owner, settings.repo, settings.content_path, post_type, settings.branch
        );
        let (status, body) = github_get(src, &url).await?;
        if !(200..300).contains(&status) {
            return Err(FetchError::Http(status));
        }
        Ok(parse_post_listing(&parse_json(&body)?, post_type, settings, &src.raw_base))
    });

    let mut posts = Vec::new();
    for result in join_all(fetches).await {
        posts.extend(result?);
    }
    src.cache.set_posts(&posts, PostSource::Github);
    Ok(posts)
}

/// One post-type directory listing -> summaries. Non-array bodies (a file at
/// the path, say) yield nothing; the `images` directory is not a post.
pub(crate) fn parse_post_listing(
    data: &Value,
    post_type: &str,
    settings: &WidgetSettings,
    raw_base: &str,
) -> Vec<PostSummary> {
    let Some(items) = data.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter(|item| {
            item.get("type").and_then(Value::as_str) == Some("dir")
                && item.get("name").and_then(Value::as_str) != Some("images")
        })
        .filter_map(|item| {
            let name = item.get("name").and_then(Value::as_str)?;
            let rel = format!("{}/{post_type}/{name}/index.md", settings.content_path);
            Some(PostSummary {
                url: format!("{raw_base}/{}/{}/{}/{rel}", settings.owner, settings.repo, settings.branch),
                name: format!("[{post_type}] {name}"),
                post_type: post_type.to_string(),
                lastmod: None,
                path: rel,
            })
        })
        .collect()
}

// =============================================================================
// REPOSITORIES
// =============================================================================

pub(crate) async fn fetch_repositories(
    src: &WebContentSource,
    username: &str,
    include_forks: bool,
) -> Result<Vec<RepoSummary>, FetchError> {
    if let Some(repositories) = src.cache.repositories(username, include_forks) {
        debug!(count = repositories.len(), "repositories: cache hit");
        return Ok(repositories);
    }

    // The authenticated endpoint also sees private repositories.
    let path = if src.cache.github_token().is_empty() {
        format!("users/{username}/repos")
    } else {
        "user/repos".to_string()
    };
    let repo_type = if include_forks { "all" } else { "owner" };
    let url = format!("{}/{path}?sort=updated&per_page=100&type={repo_type}", src.api_base);

    let (status, body) = github_get(src, &url).await?;
    if !(200..300).contains(&status) {
        return Err(map_status(status, || format!("User '{username}' not found on GitHub.")));
    }

    let repositories = parse_repo_listing(&parse_json(&body)?, include_forks)?;
    src.cache.set_repositories(username, &repositories, include_forks);
    Ok(repositories)
}

pub(crate) fn parse_repo_listing(data: &Value, include_forks: bool) -> Result<Vec<RepoSummary>, FetchError> {
    let Some(items) = data.as_array() else {
        return Err(FetchError::Malformed("GitHub API"));
    };
    let mut repositories: Vec<RepoSummary> = items
        .iter()
        .filter(|item| include_forks || item.get("fork").and_then(Value::as_bool) != Some(true))
        .filter_map(|item| {
            let text = |field: &str| {
                item.get(field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let name = item.get("name").and_then(Value::as_str)?;
            Some(RepoSummary {
                name: name.to_string(),
                full_name: text("full_name"),
                description: text("description"),
                language: {
                    let language = text("language");
                    if language.is_empty() { "Unknown".into() } else { language }
                },
                updated_at: text("updated_at"),
                default_branch: text("default_branch"),
            })
        })
        .collect();
    // ISO-8601 timestamps order lexicographically; newest activity first.
    repositories.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(repositories)
}

// =============================================================================
// REPOSITORY CONTENT
// =============================================================================

pub(crate) async fn fetch_repository_content(
    src: &WebContentSource,
    username: &str,
    repo: &str,
    path: &str,
) -> Result<Vec<ContentItem>, FetchError> {
    if let Some(content) = src.cache.repository_content(username, repo, path) {
        debug!(count = content.len(), "repository content: cache hit");
        return Ok(content);
    }

    let url = format!("{}/repos/{username}/{repo}/contents/{path}", src.api_base);
    let (status, body) = github_get(src, &url).await?;
    if !(200..300).contains(&status) {
        return Err(map_status(status, || {
            format!("Path '{path}' not found in repository '{repo}'.")
        }));
    }

    let content = parse_content_listing(&parse_json(&body)?);
    src.cache.set_repository_content(username, repo, path, &content);
    Ok(content)
}

/// Directory listing -> items, directories before files, names ascending
/// within each group. A single-file response becomes a one-item listing.
pub(crate) fn parse_content_listing(data: &Value) -> Vec<ContentItem> {
    fn item_from(value: &Value) -> Option<ContentItem> {
        let kind = match value.get("type").and_then(Value::as_str)? {
            "file" => ContentKind::File,
            "dir" => ContentKind::Dir,
            _ => return None,
        };
        Some(ContentItem {
            name: value.get("name").and_then(Value::as_str)?.to_string(),
            kind,
            path: value
                .get("path")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            size: value.get("size").and_then(Value::as_u64).unwrap_or(0),
            download_url: value
                .get("download_url")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
    }

    let mut content: Vec<ContentItem> = match data.as_array() {
        Some(items) => items.iter().filter_map(item_from).collect(),
        None => item_from(data).into_iter().collect(),
    };
    content.sort_by(|a, b| {
        let rank = |item: &ContentItem| u8::from(item.kind == ContentKind::File);
        rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
    });
    content
}

// =============================================================================
// FILE AND POST BODIES
// =============================================================================

/// Rewrite a raw-host file URL into its authenticated contents-API
/// equivalent. `None` when the URL is not on the raw host.
pub(crate) fn contents_api_url(api_base: &str, raw_base: &str, file_url: &str) -> Option<String> {
    let rest = file_url.strip_prefix(raw_base)?.strip_prefix('/')?;
    let mut parts = rest.splitn(4, '/');
    let owner = parts.next()?;
    let repo = parts.next()?;
    let branch = parts.next()?;
    let path = parts.next()?;
    Some(format!("{api_base}/repos/{owner}/{repo}/contents/{path}?ref={branch}"))
}

/// Decode the contents API's base64 `content` field (newline-wrapped).
pub(crate) fn decode_contents_payload(data: &Value) -> Option<String> {
    let encoded: String = data
        .get("content")
        .and_then(Value::as_str)?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if encoded.is_empty() {
        return None;
    }
    let bytes = STANDARD.decode(encoded).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Fetch one file body. Routes through the contents API when the URL is on
/// the raw host and a token is configured (private repositories); plain GET
/// otherwise.
async fn fetch_raw(src: &WebContentSource, url: &str) -> Result<String, FetchError> {
    let authenticated = !src.cache.github_token().is_empty();
    if let Some(api_url) = contents_api_url(&src.api_base, &src.raw_base, url).filter(|_| authenticated) {
        let (status, body) = github_get(src, &api_url).await?;
        if !(200..300).contains(&status) {
            return Err(FetchError::Http(status));
        }
        return decode_contents_payload(&parse_json(&body)?).ok_or(FetchError::Malformed("GitHub API"));
    }

    let (status, body) = plain_get(src, url).await?;
    if !(200..300).contains(&status) {
        return Err(FetchError::Http(status));
    }
    Ok(body)
}

/// Post body with per-source post-processing and caching.
pub(crate) async fn fetch_post_content(
    src: &WebContentSource,
    url: &str,
    settings: &WidgetSettings,
) -> Result<String, FetchError> {
    let source = if url.contains(&src.raw_base) { PostSource::Github } else { PostSource::Sitemap };
    if let Some(content) = src.cache.post_content(url, source) {
        return Ok(content);
    }

    let raw = fetch_raw(src, url).await?;
    let processed = match source {
        PostSource::Github => raw,
        PostSource::Sitemap => super::sitemap::extract_html_content(&raw, &settings.content_selector),
    };
    src.cache.set_post_content(url, source, &processed);
    Ok(processed)
}

/// Code file body; failures degrade to an empty string so one broken
/// attachment never sinks the chat turn that references it.
pub(crate) async fn fetch_file_content(src: &WebContentSource, url: &str) -> String {
    match fetch_raw(src, url).await {
        Ok(content) => content,
        Err(e) => {
            warn!(url, error = %e, "file content fetch failed");
            String::new()
        }
    }
}

#[cfg(test)]
#[path = "github_test.rs"]
mod tests;
