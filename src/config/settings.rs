//! Resolved user settings
//!
//! Layered configuration: compiled-in defaults → config file → environment → CLI args

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Overrides, PartialDev, PartialReset, PartialSettings, WindowEntry};
use crate::error::{ConfigError, Error, Result};
use crate::git::repo_name_from_url;

/// Fully resolved, immutable settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub dev: DevSettings,
    pub reset: ResetSettings,
}

/// Settings for `devnest dev`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevSettings {
    /// Repositories attached to every new workspace, in order
    pub repos: Vec<String>,

    /// Name of the first window, which runs `main_command`
    pub main_window: String,

    /// Command started in the main window (empty string means a plain shell)
    pub main_command: String,

    /// Text typed into the main command once it starts
    pub default_prompt: String,

    /// Custom context file template; the built-in one is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents_template: Option<PathBuf>,

    /// Additional windows, name → command. An empty command is a two-pane shell.
    pub windows: IndexMap<String, String>,
}

/// Settings for the reinstall helper; carried for completeness, no core operation reads them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetSettings {
    pub install_source: String,
    pub preserve: Vec<String>,
}

impl Default for DevSettings {
    fn default() -> Self {
        let mut windows = IndexMap::new();
        windows.insert("shell".to_string(), String::new());
        windows.insert("git".to_string(), "lazygit".to_string());
        windows.insert("files".to_string(), "mc".to_string());

        Self {
            repos: Vec::new(),
            main_window: "main".to_string(),
            main_command: "claude".to_string(),
            default_prompt: String::new(),
            agents_template: None,
            windows,
        }
    }
}

impl Default for ResetSettings {
    fn default() -> Self {
        Self {
            install_source: String::new(),
            preserve: vec![
                "projects".to_string(),
                "settings".to_string(),
                "keys".to_string(),
            ],
        }
    }
}

impl Settings {
    /// Load settings from every source.
    ///
    /// `explicit_file` replaces the default config file location and must exist.
    pub fn load(explicit_file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut layers = Vec::new();

        match explicit_file {
            Some(path) => layers.push(PartialSettings::from_file(path)?),
            None => {
                let path = Self::config_file_path()?;
                if path.exists() {
                    debug!("Loading config from {:?}", path);
                    layers.push(PartialSettings::from_file(&path)?);
                }
            }
        }

        layers.push(PartialSettings::from_env()?);

        Ok(resolve(Settings::default(), layers, overrides)?)
    }

    /// Apply one layer on top of these settings.
    ///
    /// Scalars and lists are replaced wholesale. Windows are merged key by key.
    pub fn apply(&mut self, layer: PartialSettings) {
        if let Some(dev) = layer.dev {
            self.dev.apply(dev);
        }
        if let Some(reset) = layer.reset {
            self.reset.apply(reset);
        }
    }

    /// Get the configuration file path
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Write these settings as TOML, refusing to replace an existing file
    pub fn save_new(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(ConfigError::SaveFailed(format!(
                "{} already exists",
                path.display()
            ))
            .into());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|_e| {
                Error::Config(ConfigError::DirectoryCreationFailed(parent.to_path_buf()))
            })?;
        }

        let toml = self.to_toml()?;
        std::fs::write(path, toml).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        Ok(())
    }

    /// Render as a TOML document
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed(e.to_string()))?)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "devnest", "devnest").ok_or_else(|| {
            Error::Config(ConfigError::LoadFailed(
                "Could not determine home directory".to_string(),
            ))
        })
    }
}

impl DevSettings {
    fn apply(&mut self, layer: PartialDev) {
        if let Some(repos) = layer.repos {
            self.repos = repos;
        }
        if let Some(main_window) = layer.main_window {
            self.main_window = main_window;
        }
        if let Some(main_command) = layer.main_command {
            self.main_command = main_command;
        }
        if let Some(default_prompt) = layer.default_prompt {
            self.default_prompt = default_prompt;
        }
        if let Some(template) = layer.agents_template {
            self.agents_template = if template.trim().is_empty() {
                None
            } else {
                Some(expand_home(&template))
            };
        }
        if let Some(windows) = layer.windows {
            for (name, entry) in windows {
                match entry {
                    WindowEntry::Enabled(false) => {
                        self.windows.shift_remove(&name);
                    }
                    WindowEntry::Enabled(true) => {
                        self.windows.insert(name, String::new());
                    }
                    // insert keeps the original position of a replaced key
                    WindowEntry::Command(command) => {
                        self.windows.insert(name, command);
                    }
                }
            }
        }
    }

    /// Prompt to type into the main command, if there is anything to type
    pub fn startup_prompt(&self) -> Option<&str> {
        if self.main_command.trim().is_empty() || self.default_prompt.is_empty() {
            None
        } else {
            Some(&self.default_prompt)
        }
    }
}

impl ResetSettings {
    fn apply(&mut self, layer: PartialReset) {
        if let Some(install_source) = layer.install_source {
            self.install_source = install_source;
        }
        if let Some(preserve) = layer.preserve {
            self.preserve = preserve;
        }
    }
}

/// Merge `defaults` with each layer in order (lowest precedence first), apply
/// the command-line overrides, and validate the result.
pub fn resolve(
    defaults: Settings,
    layers: impl IntoIterator<Item = PartialSettings>,
    overrides: &Overrides,
) -> std::result::Result<Settings, ConfigError> {
    let mut settings = defaults;
    for layer in layers {
        settings.apply(layer);
    }

    if let Some(prompt) = &overrides.prompt {
        settings.dev.default_prompt = prompt.clone();
    }
    if let Some(extra) = overrides.extra.as_deref().filter(|e| !e.is_empty()) {
        settings.dev.default_prompt = if settings.dev.default_prompt.is_empty() {
            extra.to_string()
        } else {
            format!("{}\n{}", settings.dev.default_prompt, extra)
        };
    }

    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> std::result::Result<(), ConfigError> {
    let dev = &settings.dev;

    validate_window_name("dev.main_window", &dev.main_window)?;
    for name in dev.windows.keys() {
        validate_window_name(&format!("dev.windows.{name}"), name)?;
        if *name == dev.main_window {
            return Err(ConfigError::InvalidValue {
                key: format!("dev.windows.{name}"),
                reason: "collides with dev.main_window".to_string(),
            });
        }
    }

    let mut seen = HashSet::new();
    for url in &dev.repos {
        let name = repo_name_from_url(url).map_err(|_| ConfigError::InvalidValue {
            key: "dev.repos".to_string(),
            reason: format!("cannot derive a repository name from '{url}'"),
        })?;
        if !seen.insert(name.clone()) {
            return Err(ConfigError::InvalidValue {
                key: "dev.repos".to_string(),
                reason: format!("more than one repository would be attached as '{name}'"),
            });
        }
    }

    if let Some(template) = &dev.agents_template {
        if !template.is_file() {
            return Err(ConfigError::TemplateNotFound(template.clone()));
        }
    }

    Ok(())
}

fn validate_window_name(key: &str, name: &str) -> std::result::Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "window name is empty".to_string(),
        });
    }
    if name.contains([':', '.']) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("window name '{name}' contains ':' or '.'"),
        });
    }
    Ok(())
}

/// Expand a leading `~` to the user's home directory
fn expand_home(path: &str) -> PathBuf {
    let home = || BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());

    if path == "~" {
        if let Some(home) = home() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
