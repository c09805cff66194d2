//! Async tmux command executor
//!
//! Every call is a single `tmux` process awaited to completion. There is no
//! timeout: tmux's own blocking behavior is relied on, and an interrupt ends
//! the whole invocation.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::Multiplexer;
use crate::error::{Error, Result, SessionError, TmuxError};
use crate::session::SessionName;

/// Build the argv that runs `command` and then leaves a shell behind, so the
/// window survives the program exiting
pub fn keep_alive_argv(command: &str) -> [String; 3] {
    [
        "sh".to_string(),
        "-c".to_string(),
        format!("{command}\nexec \"${{SHELL:-/bin/sh}}\""),
    ]
}

/// Escape `text` for `send-keys -l --`.
///
/// tmux splits its argv into commands on a word ending in `;`, and turns a
/// trailing `\;` into `;`. A backslash before the final `;` keeps the text
/// one literal word in both cases.
pub fn literal_keys_arg(text: &str) -> String {
    match text.strip_suffix(';') {
        Some(head) => format!("{head}\\;"),
        None => text.to_string(),
    }
}

/// A concurrent `new-session` that won the race shows up as a duplicate
fn new_session_error(session: &SessionName, err: Error) -> Error {
    match err {
        Error::Tmux(TmuxError::CommandFailed { ref stderr, .. })
            if stderr.contains("duplicate session") =>
        {
            SessionError::AlreadyExists(session.to_string()).into()
        }
        e => e,
    }
}

/// Runs the `tmux` binary found on `PATH`
#[derive(Debug, Clone, Default)]
pub struct TmuxExecutor;

impl TmuxExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Check if tmux is installed and accessible
    pub async fn check_installed(&self) -> Result<()> {
        let output = Command::new("tmux")
            .arg("-V")
            .output()
            .await
            .map_err(|_| TmuxError::NotInstalled)?;

        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout);
            debug!("tmux version: {}", version.trim());
            Ok(())
        } else {
            Err(TmuxError::NotInstalled.into())
        }
    }

    /// Execute a tmux command and return its output
    #[instrument(skip(self), fields(args = ?args))]
    pub async fn execute(&self, args: &[&str]) -> Result<String> {
        debug!("tmux {}", args.join(" "));

        let output = Command::new("tmux")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => Err(TmuxError::CommandFailed {
                command: format!("tmux {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TmuxError::NotInstalled.into())
            }
            Err(e) => {
                warn!("tmux command failed: {}", e);
                Err(TmuxError::CommandFailed {
                    command: format!("tmux {}", args.join(" ")),
                    stderr: e.to_string(),
                }
                .into())
            }
        }
    }

    async fn execute_owned(&self, args: &[String]) -> Result<String> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.execute(&args).await
    }

    fn window_args(
        mut args: Vec<String>,
        window: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Vec<String> {
        args.extend(["-n".to_string(), window.to_string()]);
        args.extend(["-c".to_string(), cwd.display().to_string()]);
        if let Some(command) = command {
            args.extend(keep_alive_argv(command));
        }
        args
    }
}

#[async_trait]
impl Multiplexer for TmuxExecutor {
    async fn has_session(&self, session: &SessionName) -> Result<bool> {
        let target = session.target();
        match self.execute(&["has-session", "-t", &target]).await {
            Ok(_) => Ok(true),
            // "has-session" returns non-zero if session doesn't exist
            Err(Error::Tmux(TmuxError::CommandFailed { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn new_session(
        &self,
        session: &SessionName,
        window: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<()> {
        let args = vec![
            "new-session".to_string(),
            "-d".to_string(),
            "-s".to_string(),
            session.to_string(),
        ];
        self.execute_owned(&Self::window_args(args, window, cwd, command))
            .await
            .map_err(|e| new_session_error(session, e))?;
        Ok(())
    }

    async fn new_window(
        &self,
        session: &SessionName,
        window: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<()> {
        // A trailing colon targets the session itself: next free window index
        let args = vec![
            "new-window".to_string(),
            "-d".to_string(),
            "-t".to_string(),
            format!("{}:", session.target()),
        ];
        self.execute_owned(&Self::window_args(args, window, cwd, command))
            .await?;
        Ok(())
    }

    async fn split_window(&self, session: &SessionName, window: &str, cwd: &Path) -> Result<()> {
        let target = session.window_target(window);
        let cwd = cwd.display().to_string();
        self.execute(&["split-window", "-d", "-h", "-t", &target, "-c", &cwd])
            .await?;
        Ok(())
    }

    async fn send_literal(&self, session: &SessionName, window: &str, text: &str) -> Result<()> {
        let target = session.window_target(window);
        let text = literal_keys_arg(text);
        self.execute(&["send-keys", "-t", &target, "-l", "--", &text])
            .await?;
        Ok(())
    }

    async fn send_key(&self, session: &SessionName, window: &str, key: &str) -> Result<()> {
        let target = session.window_target(window);
        self.execute(&["send-keys", "-t", &target, key]).await?;
        Ok(())
    }

    async fn select_window(&self, session: &SessionName, window: &str) -> Result<()> {
        let target = session.window_target(window);
        self.execute(&["select-window", "-t", &target]).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(session = %session))]
    async fn attach(&self, session: &SessionName) -> Result<()> {
        // Inside tmux already: move this client instead of nesting
        let verb = if std::env::var_os("TMUX").is_some() {
            "switch-client"
        } else {
            "attach-session"
        };
        let target = session.target();
        info!("Attaching to session {}", session);

        let status = Command::new("tmux")
            .args([verb, "-t", target.as_str()])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TmuxError::NotInstalled,
                _ => TmuxError::CommandFailed {
                    command: format!("tmux {verb} -t {target}"),
                    stderr: e.to_string(),
                },
            })?;

        if !status.success() {
            return Err(TmuxError::CommandFailed {
                command: format!("tmux {verb} -t {target}"),
                stderr: format!("exited with {status}"),
            }
            .into());
        }

        Ok(())
    }

    async fn kill_session(&self, session: &SessionName) -> Result<()> {
        let target = session.target();
        self.execute(&["kill-session", "-t", &target]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keep_alive_argv() {
        let argv = keep_alive_argv("lazygit");
        assert_eq!(argv[0], "sh");
        assert_eq!(argv[1], "-c");
        assert_eq!(argv[2], "lazygit\nexec \"${SHELL:-/bin/sh}\"");
    }

    #[test]
    fn test_literal_keys_arg() {
        assert_eq!(literal_keys_arg("-fix the build"), "-fix the build");
        assert_eq!(literal_keys_arg("run tests;"), "run tests\\;");
        assert_eq!(literal_keys_arg(";"), "\\;");
        assert_eq!(literal_keys_arg("a\\;"), "a\\\\;");
        assert_eq!(literal_keys_arg("a; b"), "a; b");
    }

    #[test]
    fn test_duplicate_session_maps_to_already_exists() {
        let name = SessionName::parse("ws").unwrap();
        let err = new_session_error(
            &name,
            TmuxError::CommandFailed {
                command: "tmux new-session -d -s ws".to_string(),
                stderr: "duplicate session: ws".to_string(),
            }
            .into(),
        );
        assert!(matches!(
            err,
            Error::Session(SessionError::AlreadyExists(ref n)) if n == "ws"
        ));

        let err = new_session_error(
            &name,
            TmuxError::CommandFailed {
                command: "tmux new-session -d -s ws".to_string(),
                stderr: "no server running".to_string(),
            }
            .into(),
        );
        assert!(matches!(err, Error::Tmux(TmuxError::CommandFailed { .. })));
    }

    #[test]
    fn test_window_args() {
        let args = TmuxExecutor::window_args(
            vec!["new-window".to_string()],
            "git",
            Path::new("/work/ws"),
            Some("lazygit"),
        );
        assert_eq!(
            args,
            vec![
                "new-window",
                "-n",
                "git",
                "-c",
                "/work/ws",
                "sh",
                "-c",
                "lazygit\nexec \"${SHELL:-/bin/sh}\"",
            ]
        );

        let args =
            TmuxExecutor::window_args(vec!["new-window".to_string()], "shell", Path::new("/w"), None);
        assert_eq!(args, vec!["new-window", "-n", "shell", "-c", "/w"]);
    }
}
