//! Git access for workspaces
//!
//! - `VersionControl` - the operations the workspace composer needs
//! - `GitCli` - production implementation (git CLI for mutations)
//! - `GitBackend` - gitoxide reads
//! - URL helpers for deriving attachment names

mod backend;
mod cli;
mod surface;
mod url;

pub use backend::*;
pub use cli::*;
pub use surface::*;
pub use url::*;
