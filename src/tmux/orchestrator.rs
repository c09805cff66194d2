//! Session orchestration
//!
//! Turns a [`SessionLayout`] into multiplexer calls. A session is created at
//! most once per name; re-entry goes through [`SessionOrchestrator::attach`].

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use super::{Multiplexer, PaneLayout, SessionLayout};
use crate::error::{Result, SessionError};
use crate::session::SessionName;

pub struct SessionOrchestrator<M> {
    mux: M,
}

impl<M: Multiplexer> SessionOrchestrator<M> {
    pub fn new(mux: M) -> Self {
        Self { mux }
    }

    /// Get the underlying multiplexer
    pub fn multiplexer(&self) -> &M {
        &self.mux
    }

    pub async fn session_exists(&self, name: &SessionName) -> Result<bool> {
        self.mux.has_session(name).await
    }

    /// Create the session and its windows, detached.
    ///
    /// Fails with [`SessionError::AlreadyExists`] if the name is taken. If any
    /// step after the session itself was created fails, the half-built
    /// session is killed so a later attempt starts clean.
    #[instrument(skip(self, layout), fields(session = %name))]
    pub async fn create_session(
        &self,
        name: &SessionName,
        cwd: &Path,
        layout: &SessionLayout,
    ) -> Result<()> {
        if self.mux.has_session(name).await? {
            return Err(SessionError::AlreadyExists(name.to_string()).into());
        }

        self.mux
            .new_session(name, &layout.main_window, cwd, layout.main_command.as_deref())
            .await?;

        if let Err(e) = self.populate(name, cwd, layout).await {
            warn!("Session {} is incomplete, removing it: {}", name, e);
            if let Err(kill_err) = self.mux.kill_session(name).await {
                warn!("Failed to remove incomplete session {}: {}", name, kill_err);
            }
            return Err(e);
        }

        info!(
            "Created session {} with {} windows",
            name,
            layout.windows.len() + 1
        );
        Ok(())
    }

    async fn populate(&self, name: &SessionName, cwd: &Path, layout: &SessionLayout) -> Result<()> {
        if let Some(prompt) = &layout.prompt {
            debug!("Typing startup prompt into {}", layout.main_window);
            self.mux
                .send_literal(name, &layout.main_window, prompt)
                .await?;
            self.mux.send_key(name, &layout.main_window, "Enter").await?;
        }

        for window in &layout.windows {
            match &window.layout {
                PaneLayout::SplitShell => {
                    self.mux.new_window(name, &window.name, cwd, None).await?;
                    self.mux.split_window(name, &window.name, cwd).await?;
                }
                PaneLayout::Command(command) => {
                    self.mux
                        .new_window(name, &window.name, cwd, Some(command))
                        .await?;
                }
            }
        }

        self.mux.select_window(name, &layout.main_window).await
    }

    /// Hand the terminal to an existing session
    pub async fn attach(&self, name: &SessionName) -> Result<()> {
        if !self.mux.has_session(name).await? {
            return Err(SessionError::NotFound(name.to_string()).into());
        }
        self.mux.attach(name).await
    }

    /// Select a window if it still exists; the operator may have closed it
    pub async fn focus_window(&self, name: &SessionName, window: &str) {
        if let Err(e) = self.mux.select_window(name, window).await {
            debug!("Could not select window {} in {}: {}", window, name, e);
        }
    }

    /// Kill the session if it is running. Returns whether one was killed.
    #[instrument(skip(self), fields(session = %name))]
    pub async fn destroy_session(&self, name: &SessionName) -> Result<bool> {
        if !self.mux.has_session(name).await? {
            debug!("No session {} to kill", name);
            return Ok(false);
        }
        self.mux.kill_session(name).await?;
        info!("Killed session {}", name);
        Ok(true)
    }
}
