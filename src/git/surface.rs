//! Version-control surface
//!
//! The repository composer talks to git only through this trait so it can be
//! driven by an in-memory implementation in tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// An external repository attached to a workspace as a submodule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// Short name, also the path relative to the workspace root
    pub name: String,
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// Recorded remote URL
    pub url: String,
    /// Commit the submodule is checked out at, if it could be read
    pub revision: Option<String>,
}

/// Operations the workspace needs from version control
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Whether `path` is itself the root of a repository
    async fn is_repository(&self, path: &Path) -> Result<bool>;

    /// Initialize a local-only repository at `path`
    async fn init(&self, path: &Path) -> Result<()>;

    /// Attachments recorded in the repository at `root`, in recorded order
    async fn attachments(&self, root: &Path) -> Result<Vec<Attachment>>;

    /// Attach `url` at `root/name`
    async fn attach(&self, root: &Path, url: &str, name: &str) -> Result<Attachment>;

    /// Whether the repository at `root` has no commit yet or has changes
    /// outside its submodules that are not committed
    async fn has_uncommitted(&self, root: &Path) -> Result<bool>;

    /// Stage everything and commit
    async fn commit_all(&self, root: &Path, message: &str) -> Result<()>;
}
