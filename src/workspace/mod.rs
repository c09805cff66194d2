//! Workspaces on disk
//!
//! - `RepositoryComposer` - creates, updates and removes workspaces
//! - `Workspace`, `EnsureReport` - what the composer observed and did
//! - Built-in context file template

mod composer;
mod template;
mod types;

pub use composer::*;
pub use template::*;
pub use types::*;
