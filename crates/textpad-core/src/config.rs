//! Resolved editor settings handed to the core.
//!
//! Settings persistence (font, window geometry, keybindings, recent files) belongs to the host
//! application. The host resolves its settings file and passes the editing-relevant subset here,
//! usually as JSON.

use serde::{Deserialize, Serialize};

/// Default number of characters per indent level.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Default bound on recorded undo steps per buffer.
pub const DEFAULT_UNDO_LIMIT: usize = 1000;

/// Editing settings consumed by [`crate::TextBuffer`] and [`crate::AutoPairEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Characters per indent level. Values below 1 are treated as 1.
    pub tab_width: usize,
    /// Carry indentation onto new lines and expand newlines between brackets.
    pub auto_indent: bool,
    /// Auto-close brackets and quotes, wrap selections, and type through closers.
    pub auto_pair: bool,
    /// Maximum number of undo steps kept per buffer.
    pub undo_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            auto_indent: true,
            auto_pair: true,
            undo_limit: DEFAULT_UNDO_LIMIT,
        }
    }
}

impl EditorConfig {
    /// Parse settings from JSON. Missing keys fall back to their defaults and unknown keys
    /// (window size, font, theme...) are ignored.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Clamp values into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.tab_width = self.tab_width.max(1);
        self.undo_limit = self.undo_limit.max(1);
        self
    }
}
