//! CLI configuration, read from a `notemv.toml` beside the vault.

use anyhow::Context;
use notemv_core::Settings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "notemv.toml";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Vault root; a relative path is taken from the config file location.
    pub root: Option<PathBuf>,
    pub settings: Settings,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("could not parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load `notemv.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> anyhow::Result<Self> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}
