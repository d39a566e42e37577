//! Posts tab transitions: loading with the sitemap fallback chain, selection
//! caps, and the meta-prompt controls.

use tracing::{info, warn};

use super::Widget;
use crate::state::MAX_SELECTED_POSTS;

impl Widget {
    /// Load the posts list: git-hosting listing first, sitemap fallback when
    /// that yields nothing or fails. A fallback failure reports both errors;
    /// the primary failure is never silently masked.
    pub async fn load_posts(&mut self) {
        if self.state.loading_posts {
            return;
        }
        self.state.loading_posts = true;
        self.state.posts_error = None;

        let settings = self.state.widget_settings.clone();
        match self.content.list_posts(&settings).await {
            Ok(posts) if !posts.is_empty() => {
                info!(count = posts.len(), "posts loaded");
                self.state.posts = posts;
                self.state.loading_posts = false;
            }
            Ok(_) => {
                info!("primary post source empty, trying sitemap");
                self.load_posts_from_sitemap().await;
            }
            Err(e) => {
                let message = format!("GitHub API failed: {e}. Falling back to sitemap...");
                warn!(error = %e, "primary post source failed, trying sitemap");
                self.state.posts_error = Some(message);
                self.load_posts_from_sitemap().await;
            }
        }
    }

    async fn load_posts_from_sitemap(&mut self) {
        let settings = self.state.widget_settings.clone();
        match self.content.list_posts_fallback(&settings).await {
            Ok(posts) => {
                info!(count = posts.len(), "posts loaded from sitemap");
                self.state.posts = posts;
                self.state.loading_posts = false;
            }
            Err(e) => {
                warn!(error = %e, "sitemap post source failed");
                self.state.posts_error = Some(match self.state.posts_error.take() {
                    Some(primary) => format!("{primary} Sitemap also failed: {e}"),
                    None => format!("Failed to load posts: {e}"),
                });
                self.state.loading_posts = false;
            }
        }
    }

    /// Replace the writing-sample selection. A selection beyond the cap is
    /// rejected whole — state never transiently exceeds the limit.
    pub fn set_selected_posts(&mut self, names: Vec<String>) -> bool {
        if names.len() > MAX_SELECTED_POSTS {
            return false;
        }
        self.state.selected_posts = names;
        true
    }

    /// Drop the posts caches and reload from the network.
    pub async fn refresh_posts(&mut self) {
        self.cache.clear_posts_caches();
        self.state.posts = Vec::new();
        self.load_posts().await;
    }

    pub fn update_meta_prompt(&mut self, text: impl Into<String>) {
        self.state.meta_prompt = text.into();
        self.cache.set_meta_prompt(&self.state.meta_prompt);
    }

    pub fn toggle_include_meta_prompt(&mut self) {
        self.state.include_meta_prompt = !self.state.include_meta_prompt;
        self.cache.set_include_meta_prompt(self.state.include_meta_prompt);
    }
}

#[cfg(test)]
#[path = "content_test.rs"]
mod tests;
