//! Session name derivation
//!
//! A workspace's tmux session is identified purely by the workspace
//! directory's final path component. Two workspaces with the same basename
//! under different parents map to the same session; this is the one place
//! where that mapping is defined.

use std::fmt;
use std::path::{Component, Path};

use serde::Serialize;

use crate::error::SessionError;

/// Characters tmux uses as target separators and rewrites in session names
const RESERVED: [char; 2] = ['.', ':'];

/// Validated tmux session name derived from a workspace path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionName(String);

impl SessionName {
    /// Derive the session name for a workspace directory.
    ///
    /// Only the final path component is consulted. Reserved characters are
    /// replaced with `_`, matching what tmux itself does to a name passed to
    /// `new-session -s`.
    pub fn derive(path: &Path) -> Result<Self, SessionError> {
        let component = match path.components().next_back() {
            Some(Component::Normal(name)) => name,
            _ => {
                return Err(SessionError::InvalidName {
                    name: path.display().to_string(),
                    reason: "path has no final directory component".to_string(),
                });
            }
        };

        let name = component.to_str().ok_or_else(|| SessionError::InvalidName {
            name: component.to_string_lossy().into_owned(),
            reason: "directory name is not valid UTF-8".to_string(),
        })?;

        Self::parse(name)
    }

    /// Validate and normalize an explicit session name
    pub fn parse(name: &str) -> Result<Self, SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::InvalidName {
                name: name.to_string(),
                reason: "name is empty".to_string(),
            });
        }

        let normalized = name
            .chars()
            .map(|c| if RESERVED.contains(&c) { '_' } else { c })
            .collect();

        Ok(Self(normalized))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact-match tmux target for this session.
    ///
    /// A bare `-t name` prefix-matches, so `ws` would hit a running `ws-old`.
    pub fn target(&self) -> String {
        format!("={}", self.0)
    }

    /// Exact-match tmux target for a window of this session
    pub fn window_target(&self, window: &str) -> String {
        format!("={}:{}", self.0, window)
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    #[test]
    fn test_derive_uses_basename() {
        let name = SessionName::derive(Path::new("/home/user/my-workspace")).unwrap();
        assert_eq!(name.as_str(), "my-workspace");

        let name = SessionName::derive(Path::new("/home/user/my-workspace/")).unwrap();
        assert_eq!(name.as_str(), "my-workspace");
    }

    #[test]
    fn test_derive_replaces_reserved_characters() {
        let name = SessionName::derive(Path::new("/work/api.v2:beta")).unwrap();
        assert_eq!(name.as_str(), "api_v2_beta");
    }

    #[test]
    fn test_derive_rejects_missing_component() {
        assert!(SessionName::derive(Path::new("/")).is_err());
        assert!(SessionName::derive(Path::new("/work/..")).is_err());
        assert!(SessionName::parse("   ").is_err());
    }

    #[test]
    fn test_targets_are_exact_match() {
        let name = SessionName::parse("ws").unwrap();
        assert_eq!(name.target(), "=ws");
        assert_eq!(name.window_target("git"), "=ws:git");
    }

    proptest! {
        #[test]
        fn derivation_depends_only_on_final_component(
            parent_a in proptest::collection::vec("[a-z0-9_-]{1,8}", 0..4),
            parent_b in proptest::collection::vec("[a-z0-9_-]{1,8}", 0..4),
            leaf in "[A-Za-z0-9_. :-]{0,12}[A-Za-z0-9_-]",
        ) {
            let mut a = PathBuf::from("/");
            a.extend(&parent_a);
            a.push(&leaf);
            let mut b = PathBuf::from("/srv");
            b.extend(&parent_b);
            b.push(&leaf);

            let from_a = SessionName::derive(&a).unwrap();
            let from_b = SessionName::derive(&b).unwrap();
            prop_assert_eq!(&from_a, &from_b);
            prop_assert!(!from_a.as_str().contains(['.', ':']));
        }
    }
}
