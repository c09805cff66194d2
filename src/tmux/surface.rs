//! Multiplexer control surface
//!
//! The session orchestrator drives tmux only through these primitives, so
//! tests can substitute a recording implementation.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::session::SessionName;

/// Primitive terminal-multiplexer operations
#[async_trait]
pub trait Multiplexer: Send + Sync {
    /// Whether a session with exactly this name is running
    async fn has_session(&self, session: &SessionName) -> Result<bool>;

    /// Create a detached session whose first window is `window`.
    /// `command` runs in that window; `None` starts a plain shell.
    async fn new_session(
        &self,
        session: &SessionName,
        window: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<()>;

    /// Append a window to the session
    async fn new_window(
        &self,
        session: &SessionName,
        window: &str,
        cwd: &Path,
        command: Option<&str>,
    ) -> Result<()>;

    /// Split a window into two side-by-side shell panes
    async fn split_window(&self, session: &SessionName, window: &str, cwd: &Path) -> Result<()>;

    /// Type `text` into the window verbatim (no key-name lookup)
    async fn send_literal(&self, session: &SessionName, window: &str, text: &str) -> Result<()>;

    /// Send a named key such as `Enter`
    async fn send_key(&self, session: &SessionName, window: &str, key: &str) -> Result<()>;

    async fn select_window(&self, session: &SessionName, window: &str) -> Result<()>;

    /// Hand the current terminal to the session; returns once the client detaches
    async fn attach(&self, session: &SessionName) -> Result<()>;

    async fn kill_session(&self, session: &SessionName) -> Result<()>;
}
