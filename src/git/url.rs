//! Repository URL helpers

use crate::error::WorkspaceError;

/// Derive the short repository name used as the attachment path.
///
/// Handles HTTPS, `ssh://` and SCP-like (`git@host:org/repo.git`) URLs as
/// well as local paths; a trailing slash and `.git` suffix are ignored.
pub fn repo_name_from_url(url: &str) -> Result<String, WorkspaceError> {
    let mut rest = url.trim().trim_end_matches('/');

    // SCP-like syntax has a colon before the first slash and no scheme
    if !rest.contains("://") {
        if let Some((host, path)) = rest.split_once(':') {
            if !host.contains('/') {
                rest = path;
            }
        }
    }

    let last = rest.rsplit('/').next().unwrap_or(rest);
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() || name == "." || name == ".." {
        return Err(WorkspaceError::InvalidRepositoryUrl(url.to_string()));
    }

    Ok(name.to_string())
}

/// Whether two remote URLs name the same repository for attachment purposes
pub fn same_remote(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}
