//! Engine behavior knobs.

use crate::sanitize::{InvalidCharacterAction, PlatformFamily};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// What to do with forbidden characters in a requested title.
    pub invalid_character_action: InvalidCharacterAction,
    /// Substitute used by `InvalidCharacterAction::Replace`.
    pub replacement_character: char,
    /// Keep the as-typed title in frontmatter when sanitization changed it.
    pub store_invalid_title: bool,
    /// Rewrite the frontmatter `title:` key on rename.
    pub update_title_key: bool,
    /// Rewrite the first `# ` heading on rename.
    pub update_first_heading: bool,
    /// Allow renaming documents other than `.md`.
    pub support_non_markdown_files: bool,
    /// Character classes rejected by sanitization.
    pub platform_family: PlatformFamily,
    /// How long to wait for the index to settle after the store rename.
    pub index_wait_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            invalid_character_action: InvalidCharacterAction::Error,
            replacement_character: '_',
            store_invalid_title: true,
            update_title_key: false,
            update_first_heading: false,
            support_non_markdown_files: true,
            platform_family: PlatformFamily::current(),
            index_wait_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn index_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.index_wait_timeout_secs)
    }
}
