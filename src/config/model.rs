//! Configuration model for btbuild
//!
//! Layered defaults for the command-line options. Anything given explicitly
//! on the command line wins over these values.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Default option values
    #[serde(default)]
    pub defaults: Defaults,
}

/// Default values for command-line options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Directory to bootstrap into (or previously bootstrapped)
    #[serde(default = "default_bootstrap_dir")]
    pub bootstrap_dir: String,

    /// Sysroot handed to the meta-build
    #[serde(default = "default_sysroot")]
    pub sysroot: String,

    /// Library directory relative to the sysroot
    #[serde(default = "default_libdir")]
    pub libdir: String,

    /// Parallel jobs (0 = number of CPUs)
    #[serde(default)]
    pub jobs: usize,

    /// Timeout in seconds for each repository clone
    #[serde(default = "default_clone_timeout")]
    pub clone_timeout: u64,

    /// Use treeless clones while bootstrapping
    #[serde(default)]
    pub partial_staging: bool,

    /// Use flags applied before any given on the command line
    #[serde(default)]
    pub use_flags: Vec<String>,
}

fn default_bootstrap_dir() -> String {
    "~/.floss".to_string()
}

fn default_sysroot() -> String {
    "/".to_string()
}

fn default_libdir() -> String {
    "usr/lib".to_string()
}

fn default_clone_timeout() -> u64 {
    600
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            bootstrap_dir: default_bootstrap_dir(),
            sysroot: default_sysroot(),
            libdir: default_libdir(),
            jobs: 0,
            clone_timeout: default_clone_timeout(),
            partial_staging: false,
            use_flags: Vec::new(),
        }
    }
}

impl Config {
    /// Bootstrap directory with `~` and `$VAR` expanded
    pub fn bootstrap_dir(&self, override_dir: Option<&str>) -> PathBuf {
        expand_path(override_dir.unwrap_or(&self.defaults.bootstrap_dir))
    }
}

/// Expand `~` and environment variables in a path, leaving it as-is on failure
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            tracing::warn!("Could not expand {}: {}", path, e);
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}
