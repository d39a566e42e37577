//! Sitemap fallback for post discovery.
//!
//! When the git-hosting listing yields nothing (no token, private repo, API
//! outage) the published site itself is the source of truth: the sitemap
//! names every page, and post bodies are lifted out of the rendered HTML by
//! a configured CSS class selector. Extraction is plain string scanning; the
//! widget needs text, not a DOM.

use tracing::debug;

use super::{FetchError, PostSource, PostSummary, WebContentSource};
use crate::config::WidgetSettings;

/// List posts from the sitemap referenced by the widget settings.
pub(crate) async fn fetch_posts(
    src: &WebContentSource,
    settings: &WidgetSettings,
) -> Result<Vec<PostSummary>, FetchError> {
    if let Some(posts) = src.cache.posts(PostSource::Sitemap) {
        debug!(count = posts.len(), "sitemap posts: cache hit");
        return Ok(posts);
    }

    let url = resolve_relative(&src.page_url, &settings.sitemap_xml_path);
    let (status, body) = super::github::plain_get(src, &url).await?;
    if !(200..300).contains(&status) {
        return Err(FetchError::Http(status));
    }

    let posts = posts_from_sitemap(&body, &settings.post_types);
    src.cache.set_posts(&posts, PostSource::Sitemap);
    Ok(posts)
}

/// Resolve a possibly-relative sitemap path against the page URL. Absolute
/// URLs pass through; `../` segments walk up the page's path.
pub(crate) fn resolve_relative(page_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let page = page_url.split(['?', '#']).next().unwrap_or(page_url);
    let host_end = page.find("://").map_or(0, |i| i + 3);

    // Drop the page's own segment, then one more per leading "../".
    let mut base = match page[host_end..].rfind('/') {
        Some(i) => &page[..host_end + i],
        None => page,
    };
    let mut rest = path;
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
            if let Some(i) = base[host_end..].rfind('/') {
                base = &base[..host_end + i];
            }
        } else {
            break;
        }
    }
    format!("{base}/{rest}")
}

// =============================================================================
// SITEMAP PARSING
// =============================================================================

/// Pull every `<loc>` URL out of a sitemap document.
pub(crate) fn extract_locs(xml: &str) -> Vec<String> {
    let mut locs = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<loc>") {
        let tail = &rest[start + "<loc>".len()..];
        let Some(end) = tail.find("</loc>") else {
            break;
        };
        let loc = tail[..end].trim();
        if !loc.is_empty() {
            locs.push(loc.to_string());
        }
        rest = &tail[end..];
    }
    locs
}

/// Keep sitemap URLs that live under a configured post-type segment and
/// shape them into selectable summaries named after their slug.
pub(crate) fn posts_from_sitemap(xml: &str, post_types: &[String]) -> Vec<PostSummary> {
    extract_locs(xml)
        .into_iter()
        .filter_map(|loc| {
            let post_type = post_types
                .iter()
                .find(|t| loc.contains(&format!("/{t}/")))?;
            let slug = loc
                .trim_end_matches('/')
                .rsplit('/')
                .find(|s| !s.is_empty() && *s != "index.html")?
                .to_string();
            let path = loc
                .find("://")
                .and_then(|i| loc[i + 3..].find('/').map(|j| loc[i + 3 + j..].to_string()))
                .unwrap_or_default();
            Some(PostSummary {
                url: loc,
                name: format!("[{post_type}] {slug}"),
                post_type: post_type.clone(),
                lastmod: None,
                path,
            })
        })
        .collect()
}

// =============================================================================
// HTML CONTENT EXTRACTION
// =============================================================================

/// Extract the text of the element matching a `.class` selector:
/// tags stripped, entities decoded, every line trimmed, blank lines dropped.
/// Returns an empty string when no element matches.
pub(crate) fn extract_html_content(html: &str, selector: &str) -> String {
    let class = selector.trim_start_matches('.');
    let Some((tag_name, body_start)) = find_element_with_class(html, class) else {
        return String::new();
    };
    let inner = element_inner(&html[body_start..], &tag_name);
    strip_tags(inner)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Locate the first opening tag whose class attribute contains `class` as a
/// whole token. Returns the tag name and the offset just past its `>`.
fn find_element_with_class(html: &str, class: &str) -> Option<(String, usize)> {
    let mut offset = 0;
    while let Some(open) = html[offset..].find('<') {
        let tag_start = offset + open;
        let Some(close) = html[tag_start..].find('>') else {
            return None;
        };
        let tag = &html[tag_start + 1..tag_start + close];
        offset = tag_start + close + 1;

        if tag.starts_with('/') || tag.starts_with('!') {
            continue;
        }
        let name: String = tag
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if name.is_empty() {
            continue;
        }
        if tag_classes(tag).any(|c| c == class) {
            return Some((name, offset));
        }
    }
    None
}

/// Class tokens of a raw tag string, if it has a class attribute.
fn tag_classes(tag: &str) -> impl Iterator<Item = &str> {
    let classes = tag
        .find("class=\"")
        .map(|i| &tag[i + "class=\"".len()..])
        .and_then(|rest| rest.split_once('"').map(|(value, _)| value))
        .unwrap_or("");
    classes.split_whitespace()
}

/// Inner HTML of an element whose opening tag was just consumed, honoring
/// nested same-name tags.
fn element_inner<'a>(html: &'a str, tag_name: &str) -> &'a str {
    let open_prefix = format!("<{tag_name}");
    let close = format!("</{tag_name}");
    let mut depth = 1usize;
    let mut offset = 0;
    while let Some(pos) = html[offset..].find('<') {
        let at = offset + pos;
        let rest = &html[at..];
        if rest.starts_with(&close) {
            depth -= 1;
            if depth == 0 {
                return &html[..at];
            }
            offset = at + close.len();
        } else if rest.starts_with(&open_prefix)
            && rest[open_prefix.len()..]
                .chars()
                .next()
                .is_some_and(|c| c == '>' || c.is_whitespace())
        {
            depth += 1;
            offset = at + open_prefix.len();
        } else {
            offset = at + 1;
        }
    }
    html
}

/// Drop every `<...>` span and decode the handful of entities that matter
/// for plain text.
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
