//! Session identity
//!
//! - `SessionName` - tmux session name derived from a workspace path

mod name;

pub use name::*;
