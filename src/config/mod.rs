//! Configuration module
//!
//! Handles:
//! - Typed partial layers parsed from the config file and environment
//! - Field-by-field resolution into immutable `Settings`

mod layers;
mod settings;

pub use layers::*;
pub use settings::*;
