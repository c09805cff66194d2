//! Running the main command without tmux
//!
//! `dev --no-tmux` prepares the workspace and then runs the main command in
//! the foreground, in the workspace directory, with the terminal handed over.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::info;

use crate::config::DevSettings;
use crate::error::Result;

/// Argv for running the main command directly, or `None` if none is set.
///
/// The command goes through `sh` so it may carry its own arguments. The
/// startup prompt is passed as `--prompt <text>` after them, as positional
/// parameters, so it is never parsed by the shell.
pub fn direct_argv(settings: &DevSettings) -> Option<Vec<String>> {
    let command = settings.main_command.trim();
    if command.is_empty() {
        return None;
    }

    let mut argv = vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("{command} \"$@\""),
        "sh".to_string(),
    ];
    if let Some(prompt) = settings.startup_prompt() {
        argv.extend(["--prompt".to_string(), prompt.to_string()]);
    }
    Some(argv)
}

/// Run the main command in `root` and wait for it.
///
/// Returns `None` when no main command is configured.
pub async fn run_direct(root: &Path, settings: &DevSettings) -> Result<Option<ExitStatus>> {
    let Some(argv) = direct_argv(settings) else {
        return Ok(None);
    };
    info!("Running {} in {:?}", settings.main_command, root);

    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(root)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await?;
    Ok(Some(status))
}
