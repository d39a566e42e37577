//! chatwidget — state/cache orchestration core for an embeddable AI chat widget.
//!
//! ARCHITECTURE
//! ============
//! The crate is the non-visual core of a chat widget embedded next to a piece
//! of authored content. [`widget::Widget`] owns all UI-visible state and is the
//! only place that mutates it; the host renders from [`state::WidgetState`]
//! snapshots and feeds UI events back in as method calls.
//!
//! Layering, leaf first:
//! - [`kv`] — the host-supplied flat string key-value store behind a trait.
//! - [`cache`] — typed, expiry-aware accessors over that store. Fail-open:
//!   a cache fault is always a cache miss, never an error.
//! - [`llm`] — four chat-completion wire protocols normalized to one contract.
//! - [`fetch`] — content discovery (git hosting API with a sitemap fallback),
//!   cache-first on every call.
//! - [`widget`] — the orchestrator tying the above together.
//!
//! Rendering, sanitization, and the persistence primitive itself live in the
//! host; nothing here touches a DOM.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod kv;
pub mod llm;
pub mod providers;
pub mod state;
pub mod widget;
