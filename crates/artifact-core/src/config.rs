//! Session configuration.

use crate::model::UNKNOWN_EDITOR;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default autosave quiet period.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 3000;

/// Default number of history entries requested per load.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Coordinator tuning. Every field has a default, so partial config documents are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period after the last edit before autosave runs.
    pub autosave_delay_ms: u64,
    /// When `false`, edits never arm the autosave timer.
    pub autosave_enabled: bool,
    /// Maximum history entries requested from the store.
    pub history_limit: usize,
    /// Identity recorded as `updated_by` on writes.
    pub editor_identity: String,
}

impl SessionConfig {
    /// Autosave quiet period as a [`Duration`].
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            autosave_enabled: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
            editor_identity: UNKNOWN_EDITOR.to_string(),
        }
    }
}
