//! Configuration module for btbuild
//!
//! Provides XDG-compliant layered defaults for command-line options.

pub mod loader;
pub mod model;

pub use loader::{config_paths, load_config};
pub use model::*;
