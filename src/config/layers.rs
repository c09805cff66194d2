//! Partial configuration layers
//!
//! Every source (config file, environment) is parsed into a `PartialSettings`
//! where each field is optional. Layers are applied onto the defaults one at
//! a time, field by field; see [`Settings::apply`](super::Settings::apply).

use std::path::Path;

use figment::{Figment, providers::Env};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable prefix, e.g. `DEVNEST_DEV__MAIN_COMMAND`
pub const ENV_PREFIX: &str = "DEVNEST_";

/// One configuration layer with every field optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialSettings {
    pub dev: Option<PartialDev>,
    pub reset: Option<PartialReset>,
}

/// Optional overrides for the `[dev]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialDev {
    pub repos: Option<Vec<String>>,
    pub main_window: Option<String>,
    pub main_command: Option<String>,
    pub default_prompt: Option<String>,
    /// Empty string clears a template set by a lower layer
    pub agents_template: Option<String>,
    pub windows: Option<IndexMap<String, WindowEntry>>,
}

/// Optional overrides for the `[reset]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialReset {
    pub install_source: Option<String>,
    pub preserve: Option<Vec<String>>,
}

/// A single `[dev.windows]` entry.
///
/// `name = "cmd"` adds or replaces a window, `name = false` removes one
/// inherited from a lower layer, `name = true` is a plain shell window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WindowEntry {
    Command(String),
    Enabled(bool),
}

/// Per-invocation overrides taken from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Replaces `dev.default_prompt`
    pub prompt: Option<String>,
    /// Appended to the resolved prompt on its own line
    pub extra: Option<String>,
}

impl PartialSettings {
    /// Parse a layer from TOML text. `origin` is only used in error messages.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        // toml keeps document order, which `[dev.windows]` relies on
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a layer from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
            }
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Collect the layer defined by `DEVNEST_*` environment variables.
    ///
    /// Sections and keys are separated by a double underscore so that keys
    /// containing underscores survive: `DEVNEST_DEV__DEFAULT_PROMPT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_figment(Figment::from(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract a layer from an arbitrary figment (used for the env layer)
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))
    }

    /// Whether this layer sets nothing at all
    pub fn is_empty(&self) -> bool {
        self.dev.is_none() && self.reset.is_none()
    }
}
