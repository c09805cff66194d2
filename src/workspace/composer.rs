//! Repository composer
//!
//! Brings a directory to the initialized workspace state: marker file, local
//! git repository, context file, and one submodule per configured repository.
//! Every step checks before it acts, so re-running against a partially
//! created workspace finishes the job instead of failing.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use super::{
    AttachmentResult, CONTEXT_FILE, EnsureReport, Marker, Workspace, load_context_template,
};
use crate::config::DevSettings;
use crate::error::{Error, Result, WorkspaceError};
use crate::git::{Attachment, VersionControl, repo_name_from_url, same_remote};
use crate::session::SessionName;

/// What occupies a workspace path before anything is done to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Missing,
    /// An empty directory, treated like a missing one
    Empty,
    /// A directory carrying the marker file
    Workspace,
    /// A non-empty directory without the marker file
    Foreign,
    NotADirectory,
}

/// Inspect `path` without modifying it
pub async fn probe(path: &Path) -> Result<PathState> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PathState::Missing),
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_dir() {
        return Ok(PathState::NotADirectory);
    }
    if tokio::fs::try_exists(Marker::path(path)).await? {
        return Ok(PathState::Workspace);
    }

    let mut entries = tokio::fs::read_dir(path).await?;
    if entries.next_entry().await?.is_none() {
        Ok(PathState::Empty)
    } else {
        Ok(PathState::Foreign)
    }
}

/// Creates, updates and removes workspaces on disk
pub struct RepositoryComposer<V> {
    vcs: V,
}

impl<V: VersionControl> RepositoryComposer<V> {
    pub fn new(vcs: V) -> Self {
        Self { vcs }
    }

    /// Get the underlying version control
    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Create the workspace at `path` or bring an existing one up to date.
    ///
    /// Repositories are attached in settings order. A failure stops at that
    /// repository; the ones attached before it stay attached and committed.
    #[instrument(skip(self, settings), fields(path = %path.display()))]
    pub async fn ensure_workspace(&self, path: &Path, settings: &DevSettings) -> Result<EnsureReport> {
        let session = SessionName::derive(path)?;

        let created = match probe(path).await? {
            PathState::Missing => {
                tokio::fs::create_dir_all(path).await?;
                true
            }
            PathState::Empty => true,
            PathState::Workspace => false,
            PathState::Foreign | PathState::NotADirectory => {
                return Err(WorkspaceError::PathConflict(path.to_path_buf()).into());
            }
        };

        if created {
            // Written first so a workspace whose creation fails later is
            // still recognized on the next run
            write_marker(path).await?;
            info!("Creating workspace at {:?}", path);
        }

        if !self.vcs.is_repository(path).await? {
            self.vcs.init(path).await?;
        }

        let context_file_written = self
            .write_context_file(path, settings.agents_template.as_deref())
            .await?;

        let mut recorded = self.vcs.attachments(path).await?;
        let mut attached = Vec::new();

        for url in &settings.repos {
            match self.attach_known(path, url, &recorded).await {
                Ok(AttachmentResult::Attached(attachment)) => {
                    attached.push(attachment.name.clone());
                    recorded.push(attachment);
                }
                Ok(AttachmentResult::Unchanged(_)) => {}
                Err(e) => {
                    warn!(
                        "Stopped at {} after attaching {} of {} repositories",
                        url,
                        attached.len(),
                        settings.repos.len()
                    );
                    let message = commit_message(created, &attached, context_file_written);
                    let pending = created
                        || context_file_written
                        || !attached.is_empty()
                        || self.vcs.has_uncommitted(path).await.unwrap_or(false);
                    if pending {
                        if let Err(commit_err) = self.vcs.commit_all(path, &message).await {
                            warn!("Failed to commit partial workspace: {}", commit_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        let stale = stale_attachments(&recorded, &settings.repos);
        for attachment in &stale {
            info!(
                "Repository {} ({}) is attached but no longer configured; leaving it in place",
                attachment.name, attachment.url
            );
        }

        let report = EnsureReport {
            workspace: Workspace {
                root: path.to_path_buf(),
                session,
                attachments: recorded,
                has_context_file: true,
                created_at: read_marker(path).await.map(|m| m.created_at),
            },
            created,
            attached,
            stale,
            context_file_written,
        };

        // A commit that failed on an earlier run is retried here
        if report.changed() || self.vcs.has_uncommitted(path).await? {
            let message = commit_message(created, &report.attached, context_file_written);
            self.vcs.commit_all(path, &message).await?;
        } else {
            debug!("Workspace {:?} already up to date", path);
        }

        Ok(report)
    }

    /// Attach `url` to the workspace at `root` unless it already is.
    ///
    /// Fails with [`WorkspaceError::RepositoryConflict`] if the derived name
    /// is recorded with a different remote, and with
    /// [`WorkspaceError::PathConflict`] if the target directory exists without
    /// being an attachment.
    pub async fn attach_repository(&self, root: &Path, url: &str) -> Result<AttachmentResult> {
        let recorded = self.vcs.attachments(root).await?;
        self.attach_known(root, url, &recorded).await
    }

    async fn attach_known(
        &self,
        root: &Path,
        url: &str,
        recorded: &[Attachment],
    ) -> Result<AttachmentResult> {
        let name = repo_name_from_url(url)?;

        if let Some(existing) = recorded.iter().find(|a| a.name == name) {
            if same_remote(&existing.url, url) {
                debug!("{} already attached", name);
                return Ok(AttachmentResult::Unchanged(existing.clone()));
            }
            return Err(WorkspaceError::RepositoryConflict {
                name,
                recorded: existing.url.clone(),
                requested: url.to_string(),
            }
            .into());
        }

        let target = root.join(&name);
        if tokio::fs::try_exists(&target).await? {
            return Err(WorkspaceError::PathConflict(target).into());
        }

        let attachment = self.vcs.attach(root, url, &name).await?;
        info!("Attached {} as {}", url, name);
        Ok(AttachmentResult::Attached(attachment))
    }

    /// Remove the workspace directory tree.
    ///
    /// Refuses with [`WorkspaceError::NotAWorkspace`] unless the marker file
    /// is present. Confirmation is the caller's job.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn destroy_workspace(&self, path: &Path) -> Result<()> {
        if probe(path).await? != PathState::Workspace {
            return Err(WorkspaceError::NotAWorkspace(path.to_path_buf()).into());
        }

        tokio::fs::remove_dir_all(path).await?;
        info!("Removed workspace {:?}", path);
        Ok(())
    }

    /// Read the workspace at `path`, or `None` if there is none
    pub async fn inspect(&self, path: &Path) -> Result<Option<Workspace>> {
        if probe(path).await? != PathState::Workspace {
            return Ok(None);
        }

        let attachments = if self.vcs.is_repository(path).await? {
            self.vcs.attachments(path).await?
        } else {
            Vec::new()
        };

        Ok(Some(Workspace {
            root: path.to_path_buf(),
            session: SessionName::derive(path)?,
            attachments,
            has_context_file: tokio::fs::try_exists(path.join(CONTEXT_FILE)).await?,
            created_at: read_marker(path).await.map(|m| m.created_at),
        }))
    }

    /// Write the context file unless one exists. Returns whether it wrote one.
    async fn write_context_file(&self, root: &Path, template: Option<&Path>) -> Result<bool> {
        let target = root.join(CONTEXT_FILE);
        if tokio::fs::try_exists(&target).await? {
            return Ok(false);
        }

        let content = load_context_template(template).await?;
        tokio::fs::write(&target, content).await?;
        debug!("Wrote {:?}", target);
        Ok(true)
    }
}

async fn write_marker(root: &Path) -> Result<()> {
    let content = toml::to_string(&Marker::new())
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
    tokio::fs::write(Marker::path(root), content).await?;
    Ok(())
}

async fn read_marker(root: &Path) -> Option<Marker> {
    let content = tokio::fs::read_to_string(Marker::path(root)).await.ok()?;
    toml::from_str(&content).ok()
}

fn commit_message(created: bool, attached: &[String], context_file_written: bool) -> String {
    match (created, attached.is_empty(), context_file_written) {
        (true, _, _) => "Initialize workspace".to_string(),
        (false, false, _) => format!("Attach {}", attached.join(", ")),
        (false, true, true) => format!("Add {CONTEXT_FILE}"),
        (false, true, false) => "Commit pending workspace changes".to_string(),
    }
}

/// Recorded attachments whose name no configured repository derives to
fn stale_attachments(recorded: &[Attachment], repos: &[String]) -> Vec<Attachment> {
    let configured: Vec<String> = repos
        .iter()
        .filter_map(|url| repo_name_from_url(url).ok())
        .collect();

    recorded
        .iter()
        .filter(|a| !configured.contains(&a.name))
        .cloned()
        .collect()
}
