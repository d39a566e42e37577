use super::*;
use crate::llm::types::ChatError;
use crate::llm::{ChatReply, ModelDescriptor};
use crate::state::test_helpers;
use crate::state::ChatPhase;
use crate::widget::testing::{harness, harness_ready, harness_with_chat, MockChat};

// =============================================================================
// end-to-end send
// =============================================================================

#[tokio::test]
async fn send_hello_round_trip() {
    let chat = MockChat::with_replies(vec![Ok(ChatReply {
        assistant_message: "Hi there".into(),
        total_token_count: 12,
    })]);
    let mut h = harness_with_chat(chat);

    h.widget.set_provider(ProviderId::OpenAi).await;
    h.widget.set_model("gpt-4o-mini");
    h.widget.set_api_key_input("sk-test");
    h.widget.confirm_api_key();

    h.widget.set_current_message("Hello");
    h.widget.send_current_message().await;

    let requests = h.chat.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].api_key, "sk-test");
    assert_eq!(requests[0].provider, ProviderId::OpenAi);
    assert_eq!(requests[0].model, "gpt-4o-mini");
    assert_eq!(requests[0].messages, vec![ChatMessage::user("Hello")]);

    let state = h.widget.state();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].content, "Hello");
    assert_eq!(state.messages[0].role, Role::User);
    assert_eq!(state.messages[1].content, "Hi there");
    assert_eq!(state.messages[1].role, Role::Assistant);
    assert_eq!(state.total_token_count, 12);
    assert_eq!(h.widget.chat_phase(), ChatPhase::Ready);

    // The turn was persisted under provider/model/content identity.
    let snapshot = h.cache.chat_snapshot(ProviderId::OpenAi, "gpt-4o-mini").unwrap();
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.total_token_count, 12);
}

#[tokio::test]
async fn send_failure_keeps_user_message_and_surfaces_status() {
    let chat = MockChat::with_replies(vec![Err(ChatError::Http {
        status: 401,
        status_text: "Unauthorized".into(),
    })]);
    let mut h = harness_ready(chat);

    h.widget.set_current_message("Hello");
    h.widget.send_current_message().await;

    let state = h.widget.state();
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages[0].content, "Hello");
    assert!(state.error.as_deref().unwrap().contains("401"));
    assert_eq!(h.widget.chat_phase(), ChatPhase::Error);
    assert!(!state.is_loading);
}

#[tokio::test]
async fn error_does_not_lock_the_conversation() {
    let chat = MockChat::with_replies(vec![
        Err(ChatError::Http { status: 500, status_text: "Internal Server Error".into() }),
        Ok(ChatReply { assistant_message: "recovered".into(), total_token_count: 3 }),
    ]);
    let mut h = harness_ready(chat);

    h.widget.set_current_message("first");
    h.widget.send_current_message().await;
    assert_eq!(h.widget.chat_phase(), ChatPhase::Error);

    h.widget.set_current_message("second");
    h.widget.send_current_message().await;
    assert_eq!(h.widget.chat_phase(), ChatPhase::Ready);
    assert!(h.widget.state().error.is_none());
    // user, user, assistant: the failed turn's user message was never lost.
    assert_eq!(h.widget.state().messages.len(), 3);
}

#[tokio::test]
async fn send_is_noop_while_awaiting_response() {
    let mut h = harness_ready(MockChat::new());
    h.widget.state.is_loading = true;
    h.widget.set_current_message("Hello");
    h.widget.send_current_message().await;
    assert!(h.chat.requests().is_empty());
}

#[tokio::test]
async fn send_requires_text_and_key() {
    let mut h = harness(); // no key confirmed
    h.widget.set_current_message("   ");
    h.widget.send_current_message().await;
    assert!(h.chat.requests().is_empty());
    assert!(h.widget.state().error.is_none());

    h.widget.set_current_message("Hello");
    h.widget.send_current_message().await;
    assert!(h.chat.requests().is_empty());
    assert!(h.widget.state().error.as_deref().unwrap().contains("API key"));
}

// =============================================================================
// meta-prompt injection
// =============================================================================

#[tokio::test]
async fn meta_prompt_sent_once_at_conversation_start() {
    let mut h = harness_ready(MockChat::new());
    h.widget.update_meta_prompt("Always answer in haiku.");

    h.widget.set_current_message("Hello");
    h.widget.send_current_message().await;
    h.widget.set_current_message("Again");
    h.widget.send_current_message().await;

    let requests = h.chat.requests();
    assert_eq!(requests.len(), 2);

    let first = requests[0].messages.last().unwrap();
    assert_eq!(first.content, "Always answer in haiku.\n\nHello");

    // Second turn: toggle still on, but the conversation is no longer empty.
    let second = &requests[1].messages;
    assert_eq!(second.len(), 3);
    assert_eq!(second[0].content, "Hello");
    assert_eq!(second[2].content, "Again");
    assert!(!second[2].content.contains("haiku"));

    // Display state records the attachment, not the injected text.
    assert_eq!(h.widget.state().messages[0].content, "Hello");
    assert!(h.widget.state().messages[0].attachments.as_ref().unwrap().meta_prompt);
}

#[tokio::test]
async fn meta_prompt_skipped_when_disabled_or_empty() {
    let mut h = harness_ready(MockChat::new());
    h.widget.update_meta_prompt("Be brief.");
    h.widget.toggle_include_meta_prompt(); // off

    h.widget.set_current_message("Hello");
    h.widget.send_current_message().await;
    assert_eq!(h.chat.requests()[0].messages[0].content, "Hello");
}

// =============================================================================
// attachment assembly
// =============================================================================

#[tokio::test]
async fn attachments_compose_in_meta_posts_code_order() {
    let mut h = harness_ready(MockChat::new());
    h.widget.update_meta_prompt("META");

    let post = test_helpers::post("first");
    h.content.set_post_body(&post.url, "sample body");
    h.widget.state.posts = vec![post.clone()];
    assert!(h.widget.set_selected_posts(vec![post.name.clone()]));

    let file = test_helpers::file_item("main.rs");
    h.content.set_file_body(file.download_url.as_deref().unwrap(), "fn main() {}");
    h.widget.state.selected_repository = "site".into();
    h.widget.state.repository_content = vec![file.clone()];
    assert!(h.widget.set_selected_code_files(vec![file.name.clone()]));

    h.widget.set_current_message("Hello");
    h.widget.send_current_message().await;

    let outgoing = h.chat.requests()[0].messages[0].content.clone();
    let meta_at = outgoing.find("META").unwrap();
    let posts_at = outgoing.find("<writing-sample>").unwrap();
    let code_at = outgoing.find("<code-sample>").unwrap();
    let text_at = outgoing.rfind("Hello").unwrap();
    assert!(meta_at < posts_at && posts_at < code_at && code_at < text_at);
    assert!(outgoing.contains("[blog] first\n```sample body\n```"));
    assert!(outgoing.contains("main.rs (site/src/main.rs)\n```rs\nfn main() {}\n```"));

    let attachments = h.widget.state().messages[0].attachments.clone().unwrap();
    assert!(attachments.meta_prompt);
    assert_eq!(attachments.posts, vec!["[blog] first"]);
    assert_eq!(attachments.code_files, vec!["site/src/main.rs"]);
}

#[tokio::test]
async fn empty_attachment_bodies_are_filtered() {
    let mut h = harness_ready(MockChat::new());
    let post = test_helpers::post("broken");
    // No body registered: the mock returns "", which must be filtered.
    h.widget.state.posts = vec![post.clone()];
    assert!(h.widget.set_selected_posts(vec![post.name]));

    h.widget.set_current_message("Hello");
    h.widget.send_current_message().await;

    let outgoing = h.chat.requests()[0].messages[0].content.clone();
    assert!(outgoing.contains("writing style"));
    assert!(!outgoing.contains("<writing-sample>"));
    assert!(outgoing.ends_with("Hello"));
}

// =============================================================================
// history
// =============================================================================

#[tokio::test]
async fn archiving_21_chats_keeps_newest_20() {
    let mut h = harness();
    for ts in 1..=21 {
        h.widget.state.messages = vec![Message {
            role: Role::User,
            content: format!("chat {ts}"),
            timestamp: Some(ts),
            attachments: None,
        }];
        h.widget.new_chat();
    }
    let history = &h.widget.state().chat_history;
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].timestamp, 21);
    assert_eq!(history[19].timestamp, 2);
    assert!(h.widget.state().messages.is_empty());
}

#[tokio::test]
async fn new_chat_archives_and_clears_snapshot() {
    let chat = MockChat::with_replies(vec![Ok(ChatReply {
        assistant_message: "Hi".into(),
        total_token_count: 4,
    })]);
    let mut h = harness_ready(chat);
    h.widget.set_current_message("Hello");
    h.widget.send_current_message().await;

    let provider = h.widget.state().selected_provider;
    let model = h.widget.state().selected_model.clone();
    assert!(h.cache.chat_snapshot(provider, &model).is_some());

    h.widget.new_chat();
    assert!(h.widget.state().messages.is_empty());
    assert_eq!(h.widget.state().total_token_count, 0);
    assert_eq!(h.widget.chat_phase(), ChatPhase::Empty);
    assert!(h.cache.chat_snapshot(provider, &model).is_none());
    assert_eq!(h.widget.state().chat_history.len(), 1);
    assert_eq!(h.widget.state().chat_history[0].messages[0].content, "Hello");
}

#[tokio::test]
async fn restore_moves_entry_out_of_history() {
    let mut h = harness();
    let provider = h.widget.state().selected_provider;
    let model = h.widget.state().selected_model.clone();
    h.cache.add_chat_to_history(provider, &model, test_helpers::session("older", 100));
    h.cache.add_chat_to_history(provider, &model, test_helpers::session("newer", 200));
    h.widget.reload_chat_history();

    // A live conversation is archived before the restore replaces it.
    h.widget.state.messages =
        vec![Message { role: Role::User, content: "live".into(), timestamp: Some(300), attachments: None }];

    h.widget.restore_chat(200);

    let state = h.widget.state();
    assert_eq!(state.messages[0].content, "newer");
    assert_eq!(state.total_token_count, 7);

    let timestamps: Vec<i64> = state.chat_history.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![300, 100]);

    let snapshot = h.cache.chat_snapshot(provider, &model).unwrap();
    assert_eq!(snapshot.messages[0].content, "newer");
}

#[tokio::test]
async fn restore_unknown_timestamp_is_noop() {
    let mut h = harness();
    h.widget.state.messages =
        vec![Message { role: Role::User, content: "live".into(), timestamp: Some(1), attachments: None }];
    h.widget.restore_chat(999);
    assert_eq!(h.widget.state().messages[0].content, "live");
}

#[tokio::test]
async fn delete_and_clear_history() {
    let mut h = harness();
    let provider = h.widget.state().selected_provider;
    let model = h.widget.state().selected_model.clone();
    h.cache.add_chat_to_history(provider, &model, test_helpers::session("a", 1));
    h.cache.add_chat_to_history(provider, &model, test_helpers::session("b", 2));
    h.widget.reload_chat_history();

    h.widget.delete_chat(1);
    assert_eq!(h.widget.state().chat_history.len(), 1);
    assert_eq!(h.widget.state().chat_history[0].timestamp, 2);

    h.widget.clear_history();
    assert!(h.widget.state().chat_history.is_empty());
}

#[tokio::test]
async fn clear_all_history_wipes_every_bucket() {
    let mut h = harness();
    h.cache.add_chat_to_history(ProviderId::Google, "m1", test_helpers::session("a", 1));
    h.cache.add_chat_to_history(ProviderId::OpenAi, "m2", test_helpers::session("b", 2));
    h.widget.state.messages = vec![test_helpers::message(Role::User, "live")];

    h.widget.clear_all_history();
    assert!(h.widget.state().messages.is_empty());
    assert!(h.widget.state().chat_history.is_empty());
    assert!(h.cache.chat_history(ProviderId::Google, "m1").is_empty());
    assert!(h.cache.chat_history(ProviderId::OpenAi, "m2").is_empty());
}

// =============================================================================
// provider / model switching
// =============================================================================

#[tokio::test]
async fn switching_model_swaps_chat_bucket() {
    let mut h = harness();
    let provider = h.widget.state().selected_provider;
    h.cache.set_chat_snapshot(provider, "gemini-2.5-flash", &[test_helpers::message(Role::User, "kept")], 5);

    h.widget.set_model("gemini-1.5-pro");
    assert!(h.widget.state().messages.is_empty());

    h.widget.set_model("gemini-2.5-flash");
    assert_eq!(h.widget.state().messages[0].content, "kept");
    assert_eq!(h.widget.state().total_token_count, 5);
}

#[tokio::test]
async fn switching_provider_restores_its_key_and_default_model() {
    let mut h = harness();
    h.cache.set_api_key(ProviderId::Anthropic, "sk-ant");

    h.widget.set_provider(ProviderId::Anthropic).await;
    let state = h.widget.state();
    assert_eq!(state.selected_provider, ProviderId::Anthropic);
    // Unknown carry-over model resolves to the first catalog entry by name.
    assert_eq!(state.selected_model, "claude-3-5-haiku-latest");
    assert_eq!(state.api_key, "sk-ant");
    assert!(!state.show_api_key_section);

    h.widget.set_provider(ProviderId::Google).await;
    assert!(h.widget.state().api_key.is_empty());
    assert!(h.widget.state().show_api_key_section);
}

#[tokio::test]
async fn openrouter_selection_loads_catalog_cache_first() {
    let mut h = harness();
    h.chat.set_models(vec![ModelDescriptor { id: "acme/alpha".into(), name: "Alpha".into() }]);

    h.widget.set_provider(ProviderId::OpenRouter).await;
    assert_eq!(h.widget.state().openrouter_models.len(), 1);
    assert_eq!(h.widget.state().selected_model, "acme/alpha");
    // Fetched catalog landed in the cache with its own expiry group.
    assert_eq!(h.cache.openrouter_models().unwrap().len(), 1);

    // Second activation is served from cache even if the network changed.
    h.chat.set_models(Vec::new());
    h.widget.set_provider(ProviderId::OpenRouter).await;
    assert_eq!(h.widget.state().openrouter_models.len(), 1);
}

#[test]
fn confirm_api_key_trims_and_persists() {
    let mut h = harness();
    h.widget.set_api_key_input("  sk-live  ");
    h.widget.confirm_api_key();
    assert_eq!(h.widget.state().api_key, "sk-live");
    assert!(!h.widget.state().show_api_key_section);
    assert_eq!(h.cache.api_key(ProviderId::Google), Some("sk-live".into()));

    h.widget.show_api_key_entry();
    assert!(h.widget.state().show_api_key_section);
}
