//! Git CLI implementation of [`VersionControl`]
//!
//! Reads go through gitoxide where it covers them; mutations (init,
//! submodule add, commit) shell out to the git CLI, whose submodule support
//! gitoxide does not replace yet.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use super::{Attachment, GitBackend, VersionControl};
use crate::error::{GitError, Result};

/// Runs the `git` binary found on `PATH`
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    /// Extra environment passed to every git invocation
    envs: Vec<(String, String)>,
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an environment variable for every git invocation
    /// (e.g. `GIT_AUTHOR_NAME` on machines without a configured identity)
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Run git in `dir`, returning the raw output whatever the exit status
    async fn output(&self, dir: &Path, args: &[&str]) -> Result<Output> {
        debug!("git {}", args.join(" "));

        let output = Command::new("git")
            .current_dir(dir)
            .args(args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                stderr: format!("failed to run git: {}", e),
            })?;

        Ok(output)
    }

    /// Run git in `dir` and fail on a non-zero exit
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let output = self.output(dir, args).await?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// A URL git would fetch over the `file` transport
fn is_local_url(url: &str) -> bool {
    if url.starts_with("file://") {
        return true;
    }
    if url.contains("://") {
        return false;
    }
    match url.split_once(':') {
        Some((host, _)) => host.contains('/'),
        None => true,
    }
}

/// Parse `git config --get-regexp` output over `.gitmodules`.
///
/// Lines look like `submodule.<name>.path <value>`; the name itself may
/// contain dots, so the field is split off from the right. Entries missing
/// either a path or a url are dropped.
pub fn parse_gitmodules_listing(listing: &str) -> Vec<(String, PathBuf, String)> {
    let mut entries: IndexMap<String, (Option<String>, Option<String>)> = IndexMap::new();

    for line in listing.lines() {
        let Some((key, value)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let Some(key) = key.strip_prefix("submodule.") else {
            continue;
        };
        let Some((name, field)) = key.rsplit_once('.') else {
            continue;
        };

        let entry = entries.entry(name.to_string()).or_default();
        match field {
            "path" => entry.0 = Some(value.trim().to_string()),
            "url" => entry.1 = Some(value.trim().to_string()),
            _ => {}
        }
    }

    entries
        .into_iter()
        .filter_map(|(name, (path, url))| Some((name, PathBuf::from(path?), url?)))
        .collect()
}

#[async_trait]
impl VersionControl for GitCli {
    async fn is_repository(&self, path: &Path) -> Result<bool> {
        Ok(GitBackend::is_repository(path))
    }

    #[instrument(skip(self))]
    async fn init(&self, path: &Path) -> Result<()> {
        self.run(path, &["init", "--quiet"]).await?;
        info!("Initialized repository at {:?}", path);
        Ok(())
    }

    async fn attachments(&self, root: &Path) -> Result<Vec<Attachment>> {
        if !root.join(".gitmodules").is_file() {
            return Ok(Vec::new());
        }

        let args = [
            "config",
            "--file",
            ".gitmodules",
            "--get-regexp",
            r"^submodule\..*\.(path|url)$",
        ];
        let output = self.output(root, &args).await?;

        // Exit code 1 means no matching keys
        let listing = match output.status.code() {
            Some(0) => String::from_utf8_lossy(&output.stdout).into_owned(),
            Some(1) => String::new(),
            _ => {
                return Err(GitError::CommandFailed {
                    command: format!("git {}", args.join(" ")),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                }
                .into());
            }
        };

        Ok(parse_gitmodules_listing(&listing)
            .into_iter()
            .map(|(name, path, url)| {
                let revision = GitBackend::open(root.join(&path))
                    .and_then(|backend| backend.head_commit_id())
                    .ok()
                    .flatten();
                Attachment {
                    name,
                    path,
                    url,
                    revision,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn attach(&self, root: &Path, url: &str, name: &str) -> Result<Attachment> {
        let mut args = Vec::new();
        if is_local_url(url) {
            // Recent git refuses file-transport submodules unless asked
            args.extend(["-c", "protocol.file.allow=always"]);
        }
        args.extend(["submodule", "add", "--quiet", "--", url, name]);

        self.run(root, &args).await?;

        let revision = GitBackend::open(root.join(name))
            .and_then(|backend| backend.head_commit_id())
            .ok()
            .flatten();

        info!("Attached {} at {:?}", url, root.join(name));

        Ok(Attachment {
            name: name.to_string(),
            path: PathBuf::from(name),
            url: url.to_string(),
            revision,
        })
    }

    async fn has_uncommitted(&self, root: &Path) -> Result<bool> {
        if GitBackend::open(root)?.head_commit_id()?.is_none() {
            return Ok(true);
        }
        // Work inside the attached repositories belongs to them, not the root
        let status = self
            .run(root, &["status", "--porcelain", "--ignore-submodules=all"])
            .await?;
        Ok(!status.trim().is_empty())
    }

    #[instrument(skip(self))]
    async fn commit_all(&self, root: &Path, message: &str) -> Result<()> {
        self.run(root, &["add", "-A"]).await?;
        self.run(root, &["commit", "--quiet", "--allow-empty", "-m", message])
            .await?;
        debug!("Committed in {:?}", root);
        Ok(())
    }
}
