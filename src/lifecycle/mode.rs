//! Lifecycle modes and outcomes

use std::fmt;
use std::path::PathBuf;

use crate::session::SessionName;

/// Asks the operator whether a destroy may go ahead
pub trait Confirm: Send + Sync {
    fn confirm(&self, plan: &DestroyPlan) -> bool;
}

/// Confirms everything (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _plan: &DestroyPlan) -> bool {
        true
    }
}

/// What a destroy is about to remove, shown to the operator before confirming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyPlan {
    pub root: PathBuf,
    pub session: SessionName,
    pub session_running: bool,
    pub directory_present: bool,
}

impl DestroyPlan {
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        if self.session_running {
            lines.push(format!("kill tmux session '{}'", self.session));
        }
        if self.directory_present {
            lines.push(format!(
                "delete {} and everything in it",
                self.root.display()
            ));
        }
        lines.join("\n")
    }
}

/// What `LifecycleManager::run` should do
pub enum Mode<'a> {
    /// Ensure the workspace, create the session if needed, attach
    Enter,
    /// Ensure the workspace only
    EnterNoSession,
    /// Kill the session and delete the workspace once confirmed
    Destroy(&'a dyn Confirm),
}

impl fmt::Debug for Mode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => write!(f, "Enter"),
            Self::EnterNoSession => write!(f, "EnterNoSession"),
            Self::Destroy(_) => write!(f, "Destroy"),
        }
    }
}

/// What `LifecycleManager::run` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Attached to the session; `created_session` if it was built this time
    Entered { created_session: bool },
    /// Workspace ready, no session touched
    Prepared,
    Destroyed { session_killed: bool },
    /// The operator declined the destroy
    Aborted,
}
