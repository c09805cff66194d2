//! Workspace lifecycle
//!
//! - `LifecycleManager` - sequences the composer and the orchestrator
//! - `Mode`, `Outcome` - what to do and what happened
//! - `Confirm` - the operator's go-ahead for a destroy
//! - `run_direct` - the main command in the foreground, for `--no-tmux`

mod launch;
mod manager;
mod mode;

pub use launch::*;
pub use manager::*;
pub use mode::*;
