//! Tmux integration
//!
//! - `Multiplexer` - the primitives the orchestrator needs
//! - `TmuxExecutor` - production implementation over the tmux CLI
//! - `SessionLayout` - window plan derived from settings
//! - `SessionOrchestrator` - builds, attaches and kills sessions

mod executor;
mod layout;
mod orchestrator;
mod surface;

pub use executor::*;
pub use layout::*;
pub use orchestrator::*;
pub use surface::*;
