//! Command execution module
//!
//! Provides:
//! - [`CommandSpec`] and the [`CommandRunner`] seam
//! - Streaming build steps with per-step log files
//! - Async execution with timeouts for bootstrap operations

pub mod runner;
pub mod stream;
pub mod traits;

pub use runner::*;
pub use stream::{log_path, run_streaming};
pub use traits::*;
