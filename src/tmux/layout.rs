//! Window layout plan for a new session
//!
//! The plan is computed from settings up front, so a session is either built
//! from a complete, validated plan or not at all.

use serde::Serialize;

use crate::config::DevSettings;

/// How a window's panes are populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "command")]
pub enum PaneLayout {
    /// Two side-by-side shell panes
    SplitShell,
    /// One pane running the command
    Command(String),
}

/// One additional window after the main window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSpec {
    pub name: String,
    pub layout: PaneLayout,
}

impl WindowSpec {
    /// Build from a settings entry; an empty or blank command is a split shell
    pub fn new(name: impl Into<String>, command: &str) -> Self {
        let layout = if command.trim().is_empty() {
            PaneLayout::SplitShell
        } else {
            PaneLayout::Command(command.to_string())
        };
        Self {
            name: name.into(),
            layout,
        }
    }
}

/// Everything needed to build a session, in creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionLayout {
    pub main_window: String,
    /// `None` starts a plain shell
    pub main_command: Option<String>,
    /// Typed into the main command after it starts
    pub prompt: Option<String>,
    pub windows: Vec<WindowSpec>,
}

impl SessionLayout {
    pub fn from_settings(settings: &DevSettings) -> Self {
        let main_command = Some(settings.main_command.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Self {
            main_window: settings.main_window.clone(),
            main_command,
            prompt: settings.startup_prompt().map(str::to_string),
            windows: settings
                .windows
                .iter()
                .map(|(name, command)| WindowSpec::new(name, command))
                .collect(),
        }
    }

    /// Window names in creation order, main window first
    pub fn window_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.main_window.as_str())
            .chain(self.windows.iter().map(|w| w.name.as_str()))
    }
}
