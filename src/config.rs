//! Widget configuration supplied by the host settings UI.
//!
//! The host renders a settings form from [`settings_schema`] and feeds edits
//! back through [`apply_setting`]; the persisted blob round-trips through the
//! cache layer as JSON. Unknown fields in an old blob are ignored, missing
//! fields take their defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_CONTENT_PATH: &str = "content";
pub const DEFAULT_SITEMAP_XML_PATH: &str = "../sitemap.xml";
pub const DEFAULT_CONTENT_SELECTOR: &str = ".post__content";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Please format your response in lightweight markdown (no HTML tags).";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Site and fetch configuration for the widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetSettings {
    /// GitHub account owning the site repository. Required before
    /// credential inputs unlock (see `Widget::credentials_enabled`).
    pub owner: String,
    /// Repository holding the site content.
    pub repo: String,
    /// Branch to fetch content from.
    pub branch: String,
    /// Path within the repository where content lives.
    pub content_path: String,
    /// Post-type subdirectories to list (one fetch per type).
    pub post_types: Vec<String>,
    /// Fallback sitemap location, resolved against the page URL.
    pub sitemap_xml_path: String,
    /// CSS selector locating post bodies in fallback HTML pages.
    pub content_selector: String,
    /// Initial system prompt for the model.
    pub system_prompt: String,
    /// Response randomness, 0.0 - 1.0.
    pub temperature: f64,
    /// Response token ceiling.
    pub max_tokens: u32,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: DEFAULT_BRANCH.into(),
            content_path: DEFAULT_CONTENT_PATH.into(),
            post_types: vec!["project".into(), "blog".into()],
            sitemap_xml_path: DEFAULT_SITEMAP_XML_PATH.into(),
            content_selector: DEFAULT_CONTENT_SELECTOR.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

// =============================================================================
// SETTINGS SCHEMA
// =============================================================================

/// Field value kind, for the host's form rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    List,
}

/// One entry of the host-facing settings schema.
#[derive(Debug, Clone)]
pub struct SettingField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub hint: &'static str,
}

/// Schema consumed by the host to render the settings form. Order matters:
/// it is the display order.
#[must_use]
pub fn settings_schema() -> Vec<SettingField> {
    vec![
        SettingField {
            key: "owner",
            label: "Site GitHub Owner",
            kind: FieldKind::Text,
            hint: "Username for the website repo on GitHub",
        },
        SettingField {
            key: "repo",
            label: "Site Repository",
            kind: FieldKind::Text,
            hint: "Name of the GitHub repo containing the site content",
        },
        SettingField {
            key: "branch",
            label: "Branch",
            kind: FieldKind::Text,
            hint: "Repo branch to fetch content from",
        },
        SettingField {
            key: "contentPath",
            label: "Content Path",
            kind: FieldKind::Text,
            hint: "Path in the repo where content is stored",
        },
        SettingField {
            key: "postTypes",
            label: "Post Types",
            kind: FieldKind::List,
            hint: "Types of posts to fetch from the repo or sitemap",
        },
        SettingField {
            key: "sitemapXmlPath",
            label: "Sitemap XML Path",
            kind: FieldKind::Text,
            hint: "Fallback path to sitemap XML in case GitHub is not used",
        },
        SettingField {
            key: "contentSelector",
            label: "HTML Content Selector",
            kind: FieldKind::Text,
            hint: "CSS selector to use when fetching posts from sitemap",
        },
        SettingField {
            key: "systemPrompt",
            label: "System Prompt",
            kind: FieldKind::Text,
            hint: "Initial system prompt for the AI model",
        },
        SettingField {
            key: "temperature",
            label: "Temperature (0.0 - 1.0)",
            kind: FieldKind::Number,
            hint: "Randomness of the AI responses (0.0 = deterministic, 1.0 = very random)",
        },
        SettingField {
            key: "maxTokens",
            label: "Max Tokens",
            kind: FieldKind::Number,
            hint: "Maximum number of tokens in the AI response",
        },
    ]
}

/// Apply one schema-keyed edit to the settings record.
///
/// Returns `false` when the key is unknown or the value has the wrong shape;
/// the record is left unchanged in that case.
pub fn apply_setting(settings: &mut WidgetSettings, key: &str, value: &Value) -> bool {
    fn as_string(value: &Value) -> Option<String> {
        value.as_str().map(str::to_owned)
    }

    match key {
        "owner" => as_string(value).map(|v| settings.owner = v).is_some(),
        "repo" => as_string(value).map(|v| settings.repo = v).is_some(),
        "branch" => as_string(value).map(|v| settings.branch = v).is_some(),
        "contentPath" => as_string(value).map(|v| settings.content_path = v).is_some(),
        "sitemapXmlPath" => as_string(value).map(|v| settings.sitemap_xml_path = v).is_some(),
        "contentSelector" => as_string(value).map(|v| settings.content_selector = v).is_some(),
        "systemPrompt" => as_string(value).map(|v| settings.system_prompt = v).is_some(),
        "temperature" => value.as_f64().map(|v| settings.temperature = v).is_some(),
        "maxTokens" => {
            let parsed = value.as_u64().and_then(|v| u32::try_from(v).ok());
            parsed.map(|v| settings.max_tokens = v).is_some()
        }
        "postTypes" => {
            let Some(items) = value.as_array() else {
                return false;
            };
            let types: Option<Vec<String>> = items.iter().map(|v| v.as_str().map(str::to_owned)).collect();
            types.map(|v| settings.post_types = v).is_some()
        }
        _ => false,
    }
}
