//! devnest - multi-repository development workspaces bound to tmux sessions
//!
//! A workspace is a local-only git repository whose subdirectories are git
//! submodules of the projects being worked on. Each workspace gets a tmux
//! session named after its directory, so the same unit of work can be
//! resumed from any terminal.
//!
//! # Modules
//!
//! - [`config`] - Layered settings (defaults, file, environment, CLI)
//! - [`workspace`] - Creating, inspecting and removing workspaces on disk
//! - [`git`] - Version-control surface and its git CLI implementation
//! - [`tmux`] - Multiplexer surface, session layout and orchestration
//! - [`session`] - Session name derivation
//! - [`lifecycle`] - The enter / destroy state machine
//! - `testing` - In-memory surfaces for tests (`testing` feature)
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod git;
pub mod lifecycle;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tmux;
pub mod workspace;

pub use config::{Overrides, Settings};
pub use error::{Error, Result};
pub use lifecycle::{LifecycleManager, Mode, Outcome};
pub use session::SessionName;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
