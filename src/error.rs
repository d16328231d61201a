//! Error types for btbuild
//!
//! Distinguishes fatal preconditions, subprocess failures and plain I/O so
//! callers can match on the variant instead of the message.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for bootstrap and build operations
#[derive(Error, Debug)]
pub enum BuildError {
    /// Host CPU architecture is not supported
    #[error("Only {supported} machines are currently supported by this build script (found {arch})")]
    UnsupportedArch {
        arch: String,
        supported: &'static str,
    },

    /// Staged `bt` directory is not the source tree we were pointed at
    #[error(
        "Staged {} does not match {}. Please rerun bootstrap for the current project!",
        .staged.display(),
        .bt_dir.display()
    )]
    StaleStaging { staged: PathBuf, bt_dir: PathBuf },

    /// Staging directory does not exist
    #[error("Platform dir does not exist: {}", .0.display())]
    MissingStaging(PathBuf),

    /// Staging directory has no `.gn` at its root
    #[error("Platform dir does not have .gn at root: {}", .0.display())]
    MissingGnRoot(PathBuf),

    /// Repository checkout is missing from the bootstrap area
    #[error("Repository not found: {}", .0.display())]
    MissingRepo(PathBuf),

    /// Bluetooth source directory is not a directory
    #[error("{} is not a valid directory", .0.display())]
    InvalidSourceDir(PathBuf),

    /// External command exited unsuccessfully
    #[error("Command failed with exit code {}: {command}", .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        suggestion: Option<String>,
    },

    /// Failed to spawn the command
    #[error("Failed to spawn command: {command}")]
    SpawnFailed { command: String, error: String },

    /// Command timed out
    #[error("Command timed out after {timeout_secs}s: {command}")]
    Timeout { command: String, timeout_secs: u64 },

    /// Local package manager could not be queried
    #[error("Could not query {tool} for packages: {error}")]
    PackageQuery { tool: String, error: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// True for failures that mean the working area is not usable at all
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            BuildError::UnsupportedArch { .. }
                | BuildError::StaleStaging { .. }
                | BuildError::MissingStaging(_)
                | BuildError::MissingGnRoot(_)
                | BuildError::MissingRepo(_)
                | BuildError::InvalidSourceDir(_)
        )
    }

    /// Operator hint attached to the error, if any
    pub fn suggestion(&self) -> Option<String> {
        match self {
            BuildError::CommandFailed { suggestion, .. } => suggestion.clone(),
            BuildError::SpawnFailed { command, error } => suggest_fix(command, error),
            BuildError::Timeout { .. } => {
                Some("Try a larger --clone-timeout or use --partial-staging".to_string())
            }
            BuildError::StaleStaging { .. }
            | BuildError::MissingStaging(_)
            | BuildError::MissingGnRoot(_)
            | BuildError::MissingRepo(_) => {
                Some("Run with --run-bootstrap to stage the platform directory".to_string())
            }
            _ => None,
        }
    }
}

/// Suggest fixes for common error patterns
pub fn suggest_fix(command: &str, output: &str) -> Option<String> {
    let program = command.split_whitespace().next().unwrap_or_default();

    // Missing toolchain binaries
    if output.contains("No such file or directory") || output.contains("not found") {
        return match program {
            "gn" | "ninja" | "llvm-strip" | "clang" | "clang++" => Some(format!(
                "'{}' is not installed. Run with --run-bootstrap to list missing packages.",
                program
            )),
            "cargo" => Some("'cargo' not found. Install rustup and a stable toolchain.".to_string()),
            "git" => Some("'git' not found. Install git.".to_string()),
            _ => Some("Required command not found. Check PATH and dependencies.".to_string()),
        };
    }

    if output.contains("Permission denied") {
        return Some(
            "Permission denied. Check ownership of the bootstrap directory.".to_string(),
        );
    }

    // gn cannot find its dotfile when staging is incomplete
    if output.contains("Can't find source root") || output.contains(".gn") {
        return Some("Staging looks incomplete. Rerun with --run-bootstrap.".to_string());
    }

    if output.contains("no matching package named") || output.contains("failed to select a version") {
        return Some(
            "Vendored crates are out of date. Rerun bootstrap or pass --no-vendored-rust."
                .to_string(),
        );
    }

    None
}
