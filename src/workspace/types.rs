//! Workspace data model
//!
//! A workspace is a directory holding a local-only git repository, a context
//! file, and one submodule per attached repository. It is recognized by its
//! marker file.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::git::Attachment;
use crate::session::SessionName;

/// Marker file identifying a directory as a devnest workspace
pub const MARKER_FILE: &str = ".devnest.toml";

/// Context file written at the workspace root
pub const CONTEXT_FILE: &str = "AGENTS.md";

/// Where a workspace and its session are in their lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistenceState {
    /// No workspace at the path
    Absent,
    /// Workspace on disk, no session running
    InitializedNoSession,
    /// Workspace on disk and its session is running
    InitializedWithSession,
}

impl ExistenceState {
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl fmt::Display for ExistenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::InitializedNoSession => write!(f, "initialized, no session"),
            Self::InitializedWithSession => write!(f, "initialized, session running"),
        }
    }
}

/// Contents of the marker file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Version of devnest that created the workspace
    pub version: String,
    pub created_at: DateTime<Utc>,
}

impl Marker {
    pub fn new() -> Self {
        Self {
            version: crate::VERSION.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(MARKER_FILE)
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new()
    }
}

/// Observed state of a workspace on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub root: PathBuf,
    pub session: SessionName,
    pub attachments: Vec<Attachment>,
    pub has_context_file: bool,
    /// From the marker; `None` if the marker could not be read
    pub created_at: Option<DateTime<Utc>>,
}

impl Workspace {
    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.name == name)
    }
}

/// Outcome of attaching one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentResult {
    /// Newly attached
    Attached(Attachment),
    /// Already attached to the same remote, nothing done
    Unchanged(Attachment),
}

impl AttachmentResult {
    pub fn attachment(&self) -> &Attachment {
        match self {
            Self::Attached(a) | Self::Unchanged(a) => a,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Attached(_))
    }
}

/// What `ensure_workspace` found and changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureReport {
    pub workspace: Workspace,
    /// The workspace did not exist before this call
    pub created: bool,
    /// Names of repositories attached by this call, in order
    pub attached: Vec<String>,
    /// Recorded attachments no longer listed in settings (left in place)
    pub stale: Vec<Attachment>,
    pub context_file_written: bool,
}

impl EnsureReport {
    /// Whether this call changed anything on disk
    pub fn changed(&self) -> bool {
        self.created || self.context_file_written || !self.attached.is_empty()
    }
}
