use super::*;
use crate::kv::MemoryStore;
use crate::state::test_helpers;

const PAGE_URL: &str = "https://example.com/admin/entries/ai-block-plan/index";

fn cache_with_store() -> (Cache, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Cache::new(store.clone(), PAGE_URL), store)
}

fn write_timestamp(store: &MemoryStore, timestamp_id: &str, written_at: i64) {
    let table = serde_json::json!({ timestamp_id: written_at.to_string() });
    assert!(store.set("ai_chat_timestamps", &table.to_string()));
}

// =============================================================================
// content identity + key encoding
// =============================================================================

#[test]
fn content_key_parsed_from_entry_url() {
    assert_eq!(content_key_from_url(PAGE_URL).as_deref(), Some("ai-block-plan"));
    assert_eq!(content_key_from_url("https://example.com/admin/entries/x/index.html").as_deref(), Some("x"));
    assert_eq!(content_key_from_url("https://example.com/about"), None);
    assert_eq!(content_key_from_url("https://example.com/entries//index"), None);
}

#[test]
fn encode_key_is_stable_and_alphanumeric() {
    let a = encode_key("https://raw.githubusercontent.com/a/b/main/x.md");
    assert!(!a.is_empty());
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(a, encode_key("https://raw.githubusercontent.com/a/b/main/x.md"));
    // Distinct typical URLs produce distinct keys (aliasing is tolerated but
    // must not be the common case).
    assert_ne!(a, encode_key("https://raw.githubusercontent.com/a/b/main/y.md"));
}

// =============================================================================
// expiry table
// =============================================================================

#[test]
fn expired_when_written_25_hours_ago() {
    let (cache, store) = cache_with_store();
    write_timestamp(&store, "posts_github", now_ms() - 25 * 60 * 60 * 1000);
    assert!(cache.is_expired("posts_github"));
}

#[test]
fn fresh_when_written_1_hour_ago() {
    let (cache, store) = cache_with_store();
    write_timestamp(&store, "posts_github", now_ms() - 60 * 60 * 1000);
    assert!(!cache.is_expired("posts_github"));
}

#[test]
fn expired_when_table_missing_or_corrupt() {
    let (cache, store) = cache_with_store();
    assert!(cache.is_expired("posts_github"));
    store.set("ai_chat_timestamps", "{not json");
    assert!(cache.is_expired("posts_github"));
    store.set("ai_chat_timestamps", "{\"posts_github\": \"soon\"}");
    assert!(cache.is_expired("posts_github"));
}

#[test]
fn touch_makes_group_fresh() {
    let (cache, _store) = cache_with_store();
    cache.touch("openrouter_models");
    assert!(!cache.is_expired("openrouter_models"));
}

// =============================================================================
// posts + derived content
// =============================================================================

#[test]
fn posts_round_trip_per_source() {
    let (cache, _store) = cache_with_store();
    let posts = vec![test_helpers::post("first")];
    cache.set_posts(&posts, PostSource::Github);
    assert_eq!(cache.posts(PostSource::Github), Some(posts));
    assert_eq!(cache.posts(PostSource::Sitemap), None);
}

#[test]
fn post_content_validity_rides_on_parent_list() {
    let (cache, store) = cache_with_store();
    cache.set_posts(&[test_helpers::post("first")], PostSource::Github);
    cache.set_post_content("https://x/post.md", PostSource::Github, "body");
    assert_eq!(cache.post_content("https://x/post.md", PostSource::Github), Some("body".into()));

    // Expire the parent list; the per-URL entry implicitly dies with it.
    write_timestamp(&store, "posts_github", now_ms() - 25 * 60 * 60 * 1000);
    assert_eq!(cache.post_content("https://x/post.md", PostSource::Github), None);
}

#[test]
fn clear_posts_caches_removes_lists_and_content() {
    let (cache, store) = cache_with_store();
    cache.set_posts(&[test_helpers::post("first")], PostSource::Github);
    cache.set_post_content("https://x/post.md", PostSource::Github, "body");
    cache.clear_posts_caches();
    assert_eq!(cache.posts(PostSource::Github), None);
    assert!(!store.keys().iter().any(|k| k.starts_with("ai_chat_posts_list_")));
    assert!(!store.keys().iter().any(|k| k.starts_with("ai_chat_post_content_")));
}

#[test]
fn corrupt_list_entry_reads_as_miss() {
    let (cache, store) = cache_with_store();
    cache.set_posts(&[test_helpers::post("first")], PostSource::Github);
    store.set("ai_chat_posts_list_github", "][");
    assert_eq!(cache.posts(PostSource::Github), None);
}

// =============================================================================
// repositories + code session
// =============================================================================

#[test]
fn repositories_keyed_by_user_and_fork_flag() {
    let (cache, _store) = cache_with_store();
    let repos = vec![test_helpers::repo("site")];
    cache.set_repositories("octocat", &repos, false);
    assert_eq!(cache.repositories("octocat", false), Some(repos));
    assert_eq!(cache.repositories("octocat", true), None);
    assert_eq!(cache.repositories("hubot", false), None);
}

#[test]
fn repository_content_valid_under_either_fork_bucket() {
    let (cache, store) = cache_with_store();
    cache.set_repositories("octocat", &[test_helpers::repo("site")], false);
    let items = vec![test_helpers::file_item("main.rs")];
    cache.set_repository_content("octocat", "site", "src", &items);
    assert_eq!(cache.repository_content("octocat", "site", "src"), Some(items));

    write_timestamp(&store, "repositories_octocat_owner", now_ms() - 25 * 60 * 60 * 1000);
    assert_eq!(cache.repository_content("octocat", "site", "src"), None);
}

#[test]
fn code_session_round_trip() {
    let (cache, _store) = cache_with_store();
    let session = CodeSession {
        username: "octocat".into(),
        selected_repository: "site".into(),
        current_path: "src".into(),
        selected_code_files: vec!["main.rs".into()],
        include_forks: true,
        username_edited: true,
    };
    cache.set_code_session(&session);
    assert_eq!(cache.code_session(), Some(session));
}

#[test]
fn clear_code_caches_wipes_everything() {
    let (cache, store) = cache_with_store();
    cache.set_repositories("octocat", &[test_helpers::repo("site")], false);
    cache.set_repository_content("octocat", "site", "", &[test_helpers::dir_item("src")]);
    cache.set_code_session(&CodeSession::default());
    cache.clear_code_caches("octocat");
    assert_eq!(cache.repositories("octocat", false), None);
    assert_eq!(cache.code_session(), None);
    assert!(!store.keys().iter().any(|k| k.starts_with("ai_chat_repositor")));
}

// =============================================================================
// credentials, meta prompt, model selection
// =============================================================================

#[test]
fn api_keys_stored_per_provider() {
    let (cache, _store) = cache_with_store();
    cache.set_api_key(ProviderId::OpenAi, "sk-one");
    cache.set_api_key(ProviderId::Anthropic, "sk-two");
    assert_eq!(cache.api_key(ProviderId::OpenAi), Some("sk-one".into()));
    assert_eq!(cache.api_key(ProviderId::Anthropic), Some("sk-two".into()));
    assert_eq!(cache.api_key(ProviderId::Google), None);
}

#[test]
fn include_meta_prompt_defaults_true() {
    let (cache, _store) = cache_with_store();
    assert!(cache.include_meta_prompt());
    cache.set_include_meta_prompt(false);
    assert!(!cache.include_meta_prompt());
}

#[test]
fn selected_model_scoped_to_content_identity() {
    let (cache, _store) = cache_with_store();
    let pick = SelectedModel { provider: ProviderId::OpenAi, model: "gpt-4o-mini".into() };
    cache.set_selected_model(&pick);
    assert_eq!(cache.selected_model(), Some(pick));

    let bare = Cache::new(Arc::new(MemoryStore::new()), "https://example.com/about");
    bare.set_selected_model(&SelectedModel { provider: ProviderId::Google, model: "g".into() });
    assert_eq!(bare.selected_model(), None);
}

#[test]
fn openrouter_models_have_their_own_expiry() {
    let (cache, store) = cache_with_store();
    let models = vec![ModelDescriptor { id: "a".into(), name: "A".into() }];
    cache.set_openrouter_models(&models);
    assert_eq!(cache.openrouter_models(), Some(models));

    write_timestamp(&store, "openrouter_models", now_ms() - 25 * 60 * 60 * 1000);
    assert_eq!(cache.openrouter_models(), None);
}

// =============================================================================
// chat snapshot + history
// =============================================================================

#[test]
fn chat_snapshot_round_trip() {
    let (cache, _store) = cache_with_store();
    let messages = vec![test_helpers::message(crate::llm::Role::User, "hi")];
    cache.set_chat_snapshot(ProviderId::Google, "gemini-2.5-flash", &messages, 9);
    let snapshot = cache.chat_snapshot(ProviderId::Google, "gemini-2.5-flash").unwrap();
    assert_eq!(snapshot.messages, messages);
    assert_eq!(snapshot.total_token_count, 9);
    // Scoped by model.
    assert!(cache.chat_snapshot(ProviderId::Google, "gemini-1.5-pro").is_none());

    cache.clear_chat_snapshot(ProviderId::Google, "gemini-2.5-flash");
    assert!(cache.chat_snapshot(ProviderId::Google, "gemini-2.5-flash").is_none());
}

#[test]
fn history_caps_at_twenty_newest_first() {
    let (cache, _store) = cache_with_store();
    for ts in 1..=21 {
        cache.add_chat_to_history(ProviderId::Google, "m", test_helpers::session("chat", ts));
    }
    let history = cache.chat_history(ProviderId::Google, "m");
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].timestamp, 21);
    assert_eq!(history[19].timestamp, 2);
}

#[test]
fn empty_sessions_are_not_archived() {
    let (cache, _store) = cache_with_store();
    let empty = ChatSession { messages: Vec::new(), total_token_count: 0, timestamp: 1 };
    cache.add_chat_to_history(ProviderId::Google, "m", empty);
    assert!(cache.chat_history(ProviderId::Google, "m").is_empty());
}

#[test]
fn clear_all_chat_caches_spans_buckets() {
    let (cache, store) = cache_with_store();
    cache.set_chat_snapshot(ProviderId::Google, "a", &[test_helpers::message(crate::llm::Role::User, "x")], 1);
    cache.add_chat_to_history(ProviderId::OpenAi, "b", test_helpers::session("chat", 5));
    cache.clear_all_chat_caches();
    assert!(!store.keys().iter().any(|k| k.starts_with("ai_chat_responses_")));
    assert!(!store.keys().iter().any(|k| k.starts_with("ai_chat_history_")));
}

// =============================================================================
// fail-open behavior
// =============================================================================

#[test]
fn refused_writes_degrade_to_misses() {
    let store = Arc::new(MemoryStore::with_capacity_bytes(8));
    let cache = Cache::new(store, PAGE_URL);
    cache.set_posts(&[test_helpers::post("first")], PostSource::Github);
    // The write never landed; reads see a miss, nothing panics.
    assert_eq!(cache.posts(PostSource::Github), None);
}
