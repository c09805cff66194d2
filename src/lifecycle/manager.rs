//! Lifecycle manager - the workspace/session state machine
//!
//! ```text
//! ABSENT --ensure--> INITIALIZED_NO_SESSION --create--> INITIALIZED_WITH_SESSION
//! INITIALIZED_* --destroy--> ABSENT
//! ```
//!
//! Every step is safe to re-run, so recovering from a failure is running the
//! same command again.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{Confirm, DestroyPlan, Mode, Outcome};
use crate::config::Settings;
use crate::error::{Error, Result, SessionError, WorkspaceError};
use crate::git::{Attachment, VersionControl, repo_name_from_url};
use crate::session::SessionName;
use crate::tmux::{Multiplexer, SessionLayout, SessionOrchestrator};
use crate::workspace::{ExistenceState, PathState, RepositoryComposer, probe};

/// Everything `devnest status` reports about a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub root: PathBuf,
    pub session: SessionName,
    pub state: ExistenceState,
    pub attachments: Vec<Attachment>,
    /// Configured repositories not attached yet
    pub missing: Vec<String>,
    /// Attached repositories no longer configured
    pub stale: Vec<String>,
    pub has_context_file: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// Coordinates the repository composer and the session orchestrator
pub struct LifecycleManager<V, M> {
    composer: RepositoryComposer<V>,
    sessions: SessionOrchestrator<M>,
}

impl<V: VersionControl, M: Multiplexer> LifecycleManager<V, M> {
    pub fn new(vcs: V, mux: M) -> Self {
        Self {
            composer: RepositoryComposer::new(vcs),
            sessions: SessionOrchestrator::new(mux),
        }
    }

    pub fn composer(&self) -> &RepositoryComposer<V> {
        &self.composer
    }

    pub fn sessions(&self) -> &SessionOrchestrator<M> {
        &self.sessions
    }

    /// Run one lifecycle operation against the workspace at `path`
    #[instrument(skip(self, settings), fields(path = %path.display()))]
    pub async fn run(&self, path: &Path, mode: Mode<'_>, settings: &Settings) -> Result<Outcome> {
        match mode {
            Mode::Enter => self.enter(path, settings).await,
            Mode::EnterNoSession => {
                let report = self.composer.ensure_workspace(path, &settings.dev).await?;
                info!("Workspace ready at {:?}", report.workspace.root);
                Ok(Outcome::Prepared)
            }
            Mode::Destroy(confirm) => self.destroy(path, confirm).await,
        }
    }

    async fn enter(&self, path: &Path, settings: &Settings) -> Result<Outcome> {
        // Nothing touches tmux until the workspace is in order
        let report = self.composer.ensure_workspace(path, &settings.dev).await?;
        let name = &report.workspace.session;

        let created_session = if self.sessions.session_exists(name).await? {
            info!("Session {} already running", name);
            self.sessions
                .focus_window(name, &settings.dev.main_window)
                .await;
            false
        } else {
            let layout = SessionLayout::from_settings(&settings.dev);
            match self.sessions.create_session(name, path, &layout).await {
                Ok(()) => true,
                // Started by a concurrent invocation in between; use it
                Err(Error::Session(SessionError::AlreadyExists(_))) => false,
                Err(e) => return Err(e),
            }
        };

        self.sessions.attach(name).await?;
        Ok(Outcome::Entered { created_session })
    }

    async fn destroy(&self, path: &Path, confirm: &dyn Confirm) -> Result<Outcome> {
        let session = SessionName::derive(path)?;

        let directory_present = match probe(path).await? {
            PathState::Workspace => true,
            PathState::Missing => false,
            _ => return Err(WorkspaceError::NotAWorkspace(path.to_path_buf()).into()),
        };
        let session_running = self.sessions.session_exists(&session).await?;

        if !directory_present && !session_running {
            return Err(WorkspaceError::NotAWorkspace(path.to_path_buf()).into());
        }

        let plan = DestroyPlan {
            root: path.to_path_buf(),
            session,
            session_running,
            directory_present,
        };
        if !confirm.confirm(&plan) {
            info!("Destroy of {:?} cancelled", path);
            return Ok(Outcome::Aborted);
        }

        let session_killed = match self.sessions.destroy_session(&plan.session).await {
            Ok(true) => true,
            Ok(false) => {
                warn!("Session {} was not running", plan.session);
                false
            }
            Err(e) => {
                warn!("Failed to kill session {}: {}", plan.session, e);
                false
            }
        };

        if directory_present {
            self.composer.destroy_workspace(path).await?;
        } else {
            warn!("Workspace directory {:?} does not exist", path);
        }

        Ok(Outcome::Destroyed { session_killed })
    }

    /// Where the workspace at `path` is in its lifecycle
    pub async fn state(&self, path: &Path) -> Result<ExistenceState> {
        if probe(path).await? != PathState::Workspace {
            return Ok(ExistenceState::Absent);
        }
        let session = SessionName::derive(path)?;
        Ok(if self.sessions.session_exists(&session).await? {
            ExistenceState::InitializedWithSession
        } else {
            ExistenceState::InitializedNoSession
        })
    }

    /// Compare the workspace at `path` with `settings` without changing anything
    pub async fn status(&self, path: &Path, settings: &Settings) -> Result<StatusReport> {
        let session = SessionName::derive(path)?;
        let state = self.state(path).await?;
        let workspace = self.composer.inspect(path).await?;

        let attachments = workspace
            .as_ref()
            .map(|w| w.attachments.clone())
            .unwrap_or_default();
        let configured: Vec<String> = settings
            .dev
            .repos
            .iter()
            .filter_map(|url| repo_name_from_url(url).ok())
            .collect();

        Ok(StatusReport {
            root: path.to_path_buf(),
            session,
            state,
            missing: configured
                .iter()
                .filter(|name| !attachments.iter().any(|a| &a.name == *name))
                .cloned()
                .collect(),
            stale: attachments
                .iter()
                .filter(|a| !configured.contains(&a.name))
                .map(|a| a.name.clone())
                .collect(),
            has_context_file: workspace.as_ref().is_some_and(|w| w.has_context_file),
            created_at: workspace.as_ref().and_then(|w| w.created_at),
            attachments,
        })
    }
}
