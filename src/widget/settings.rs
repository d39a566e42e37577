//! Settings tab transitions.

use serde_json::Value;
use tracing::info;

use super::Widget;
use crate::config;

impl Widget {
    pub(crate) fn load_widget_settings(&mut self) {
        self.state.widget_settings = self.cache.widget_settings().unwrap_or_default();
    }

    /// Apply one schema-keyed settings edit and persist the blob.
    ///
    /// Changing `owner` also moves the browsing username along with it — a
    /// one-way default that stops applying forever once the user has edited
    /// the username directly.
    pub fn update_setting(&mut self, key: &str, value: &Value) -> bool {
        if !config::apply_setting(&mut self.state.widget_settings, key, value) {
            return false;
        }
        self.cache.set_widget_settings(&self.state.widget_settings);

        if key == "owner"
            && !self.state.username_edited
            && self.state.widget_settings.owner != self.state.username
        {
            info!(owner = %self.state.widget_settings.owner, "username follows owner setting");
            self.state.username = self.state.widget_settings.owner.clone();
            self.persist_code_session();
        }
        true
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
