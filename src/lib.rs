//! btbuild - host build orchestrator for the Floss Bluetooth stack
//!
//! Drives the external tools a Linux host build of Floss needs:
//! - **Bootstrap** - clone platform2 and friends and assemble a staging tree
//! - **GN/ninja** - generate and build the C++ code
//! - **cargo** - build, test and lint the Rust code against vendored crates
//!
//! ## Features
//!
//! - Use flags with common-mk defaults and `-flag` negation
//! - Explicit per-invocation toolchain environment, printable for other tools
//! - Per-target log files under the output directory
//! - Clone timeouts with bounded retries
//! - XDG-compliant layered configuration
//!
//! ## Targets
//!
//! `prepare`, `hosttools`, `rust`, `docs`, `main`, `test`, `clippy`, `utils`,
//! `install`, `bloat`, `clean` and `all` (prepare, hosttools, main, rust).

pub mod bootstrap;
pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;

pub use bootstrap::Bootstrapper;
pub use builder::{BuildContext, BuildOptions, Builder, EnvOverlay, Target, UseFlags};
pub use cli::{Cli, Mode};
pub use config::Config;
pub use error::BuildError;
pub use executor::{CommandRunner, CommandSpec, SystemRunner};
