//! CLI module for btbuild
//!
//! One command with three modes:
//! - `--run-bootstrap` - stage repositories and report missing packages
//! - `--print-env` - print the build environment for other tools
//! - otherwise build `--target`

pub mod commands;

pub use commands::{Cli, EnvFormat, Mode};

use crate::error::BuildError;
use crate::executor::{CommandRunner, CommandSpec};

/// The only host architecture builds are supported on
pub const SUPPORTED_ARCH: &str = "x86_64";

/// Machine name of the running host (`uname -m`)
///
/// Falls back to the architecture btbuild was compiled for when `uname`
/// cannot be run.
pub fn host_arch<R: CommandRunner + ?Sized>(runner: &R) -> String {
    match runner.stdout(&CommandSpec::new("uname").arg("-m")) {
        Ok(machine) if !machine.trim().is_empty() => machine.trim().to_string(),
        Ok(_) => std::env::consts::ARCH.to_string(),
        Err(e) => {
            tracing::debug!("uname failed ({}); assuming {}", e, std::env::consts::ARCH);
            std::env::consts::ARCH.to_string()
        }
    }
}

/// Reject hosts other than [`SUPPORTED_ARCH`]
///
/// `arch` is a `uname -m` machine name.
pub fn check_host_arch(arch: &str) -> Result<(), BuildError> {
    if arch == SUPPORTED_ARCH {
        Ok(())
    } else {
        Err(BuildError::UnsupportedArch {
            arch: arch.to_string(),
            supported: SUPPORTED_ARCH,
        })
    }
}
