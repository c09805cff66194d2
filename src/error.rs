//! Error types for devnest
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `Display` and `Error` impls.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for devnest
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Tmux error: {0}")]
    Tmux(#[from] TmuxError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short, stable label for the error kind, printed alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Workspace(WorkspaceError::PathConflict(_)) => "PathConflictError",
            Self::Workspace(WorkspaceError::NotAWorkspace(_)) => "NotAWorkspaceError",
            Self::Workspace(WorkspaceError::RepositoryConflict { .. }) => {
                "RepositoryConflictError"
            }
            Self::Workspace(WorkspaceError::InvalidRepositoryUrl(_)) => "ConfigError",
            Self::Session(SessionError::AlreadyExists(_)) => "SessionAlreadyExistsError",
            Self::Session(SessionError::NotFound(_)) => "SessionNotFoundError",
            Self::Session(SessionError::InvalidName { .. }) => "InvalidSessionNameError",
            Self::Tmux(_) | Self::Git(_) => "ExecutionError",
            Self::Io(_) => "IoError",
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Context file template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("Failed to create config directory: {0}")]
    DirectoryCreationFailed(PathBuf),
}

/// On-disk workspace precondition errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("{0} exists and is not a devnest workspace")]
    PathConflict(PathBuf),

    #[error("Refusing to delete {0}: not a devnest workspace")]
    NotAWorkspace(PathBuf),

    #[error("Repository '{name}' is already attached to {recorded}, refusing to point it at {requested}")]
    RepositoryConflict {
        name: String,
        recorded: String,
        requested: String,
    },

    #[error("Cannot derive a repository name from '{0}'")]
    InvalidRepositoryUrl(String),
}

/// Multiplexer session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid session name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

/// Tmux invocation errors
#[derive(Error, Debug)]
pub enum TmuxError {
    #[error("Tmux is not installed or not in PATH")]
    NotInstalled,

    #[error("Tmux command failed: {command} - {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// Git invocation errors
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Git command failed: {command} - {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Gitoxide error: {0}")]
    Gix(String),
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<gix::open::Error> for GitError {
    fn from(e: gix::open::Error) -> Self {
        GitError::Gix(e.to_string())
    }
}
