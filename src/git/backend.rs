//! Read-only git access using gitoxide

use std::path::{Path, PathBuf};

use gix::Repository;
use tracing::{debug, instrument};

use crate::error::{GitError, Result};

/// Read-only handle on a repository, opened with gitoxide
pub struct GitBackend {
    /// The gitoxide repository handle
    repo: Repository,
    /// Path to the repository
    path: PathBuf,
}

impl GitBackend {
    /// Open the repository rooted exactly at `path` (parents are not searched)
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let repo = gix::open(&path).map_err(|e| {
            if e.to_string().contains("not a git repository") {
                GitError::NotARepository(path.clone())
            } else {
                GitError::from(e)
            }
        })?;

        debug!("Opened repository at {:?}", path);

        Ok(Self { repo, path })
    }

    /// Whether `path` is the root of a repository
    pub fn is_repository(path: &Path) -> bool {
        path.join(".git").exists() && gix::open(path).is_ok()
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the HEAD commit ID, or `None` for an unborn branch
    pub fn head_commit_id(&self) -> Result<Option<String>> {
        let head = self.repo.head().map_err(|e| GitError::Gix(e.to_string()))?;
        Ok(head.id().map(|id| id.to_string()))
    }
}
