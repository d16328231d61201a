//! CLI argument definitions using clap
//!
//! A single flat command: the mode flags pick bootstrap, environment printing
//! or a build, and everything else tunes that mode.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::builder::BuildOptions;
use crate::config::{expand_path, Config};

/// Simple build for host.
///
/// Stages the platform2 build environment next to a Floss checkout and runs
/// GN, ninja and cargo for a named target.
#[derive(Parser, Debug)]
#[command(name = "btbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run bootstrap code to verify build env is ok to build
    #[arg(long, conflicts_with = "print_env")]
    pub run_bootstrap: bool,

    /// Print environment variables used for build
    #[arg(long)]
    pub print_env: bool,

    /// Directory to run bootstrap on (or was previously run on) [default: ~/.floss]
    #[arg(long, value_name = "DIR")]
    pub bootstrap_dir: Option<String>,

    /// Bluetooth source directory [default: current directory]
    #[arg(long, value_name = "DIR", env = "FLOSS_BT_DIR")]
    pub bt_dir: Option<PathBuf>,

    /// Set a specific sysroot path [default: /]
    #[arg(long, value_name = "DIR")]
    pub sysroot: Option<String>,

    /// Libdir relative to the sysroot [default: usr/lib]
    #[arg(long)]
    pub libdir: Option<String>,

    /// Number of jobs to run (0 = number of CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Run specific build target
    #[arg(short, long, default_value = "all")]
    pub target: String,

    /// Set use flags; prefix with '-' to disable
    #[arg(
        long = "use",
        value_name = "FLAG",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub use_flags: Vec<String>,

    /// Don't compile test code
    #[arg(long)]
    pub notest: bool,

    /// Run test with this string in the name
    #[arg(long, value_name = "NAME")]
    pub test_name: Option<String>,

    /// Don't use clang compiler
    #[arg(long)]
    pub no_clang: bool,

    /// Skip stripping binaries during install
    #[arg(long)]
    pub no_strip: bool,

    /// Do not use vendored rust crates
    #[arg(long)]
    pub no_vendored_rust: bool,

    /// Build Rust code as debug
    #[arg(long)]
    pub rust_debug: bool,

    /// Verbose logs for build
    #[arg(short, long)]
    pub verbose: bool,

    /// Bootstrap git repositories with partial clones
    #[arg(long)]
    pub partial_staging: bool,

    /// Timeout in seconds for repository cloning during bootstrap [default: 600]
    #[arg(long, value_name = "SECS")]
    pub clone_timeout: Option<u64>,

    /// Config file path (overrides default XDG paths)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format for --print-env
    #[arg(short, long, value_enum, default_value = "shell")]
    pub format: EnvFormat,
}

/// What an invocation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Bootstrap,
    PrintEnv,
    Build,
}

/// Output format for the build environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvFormat {
    /// `export KEY='value'` lines
    Shell,
    /// JSON object
    Json,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.run_bootstrap {
            Mode::Bootstrap
        } else if self.print_env {
            Mode::PrintEnv
        } else {
            Mode::Build
        }
    }

    /// Bootstrap directory, expanded
    pub fn bootstrap_dir(&self, config: &Config) -> PathBuf {
        config.bootstrap_dir(self.bootstrap_dir.as_deref())
    }

    /// Bluetooth source directory, defaulting to the current directory
    pub fn bt_dir(&self) -> std::io::Result<PathBuf> {
        match self.bt_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }

    pub fn clone_timeout(&self, config: &Config) -> Duration {
        Duration::from_secs(self.clone_timeout.unwrap_or(config.defaults.clone_timeout))
    }

    pub fn partial_staging(&self, config: &Config) -> bool {
        self.partial_staging || config.defaults.partial_staging
    }

    /// Build options with config values filling anything not given here
    ///
    /// Config use flags come first so command-line flags override them.
    pub fn build_options(&self, config: &Config) -> std::io::Result<BuildOptions> {
        let defaults = &config.defaults;
        let mut options = BuildOptions::new(self.bootstrap_dir(config), self.bt_dir()?);

        options.sysroot = expand_path(self.sysroot.as_deref().unwrap_or(&defaults.sysroot));
        options.libdir = self.libdir.clone().unwrap_or_else(|| defaults.libdir.clone());
        options.jobs = self.jobs.unwrap_or(defaults.jobs);
        options.target = self.target.clone();
        options.use_flags = defaults
            .use_flags
            .iter()
            .chain(self.use_flags.iter())
            .cloned()
            .collect();
        options.notest = self.notest;
        options.test_name = self.test_name.clone();
        options.no_clang = self.no_clang;
        options.no_strip = self.no_strip;
        options.no_vendored_rust = self.no_vendored_rust;
        options.rust_debug = self.rust_debug;
        options.verbose = self.verbose;

        Ok(options)
    }
}
