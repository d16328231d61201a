//! Resolved paths and settings for one build invocation

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::unsync::OnceCell;

use crate::error::BuildError;

use super::flags::UseFlags;

/// Value used when no base library version can be found
pub const BASE_VER_NOT_INSTALLED: &str = "NOT-INSTALLED";

/// Inputs for a build invocation, usually straight from the command line
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory bootstrap ran in
    pub bootstrap_dir: PathBuf,
    /// Bluetooth source tree this build is for
    pub bt_dir: PathBuf,
    /// Sysroot handed to the meta-build
    pub sysroot: PathBuf,
    /// Library directory relative to the sysroot
    pub libdir: String,
    /// Parallel jobs (0 = number of CPUs)
    pub jobs: usize,
    /// Target name
    pub target: String,
    /// Use flag overrides
    pub use_flags: Vec<String>,
    /// Do not build test code
    pub notest: bool,
    /// Only run tests with this string in their name
    pub test_name: Option<String>,
    /// Build with gcc instead of clang
    pub no_clang: bool,
    /// Skip stripping binaries during install
    pub no_strip: bool,
    /// Do not redirect cargo to the vendored crates
    pub no_vendored_rust: bool,
    /// Build Rust code in debug mode
    pub rust_debug: bool,
    /// Ask gn and ninja for verbose output
    pub verbose: bool,
}

impl BuildOptions {
    /// Options with defaults for everything but the two directories
    pub fn new(bootstrap_dir: impl Into<PathBuf>, bt_dir: impl Into<PathBuf>) -> Self {
        Self {
            bootstrap_dir: bootstrap_dir.into(),
            bt_dir: bt_dir.into(),
            sysroot: PathBuf::from("/"),
            libdir: "usr/lib".to_string(),
            jobs: 0,
            target: "all".to_string(),
            use_flags: Vec::new(),
            notest: false,
            test_name: None,
            no_clang: false,
            no_strip: false,
            no_vendored_rust: false,
            rust_debug: false,
            verbose: false,
        }
    }
}

/// Everything a build needs to know about where things live
#[derive(Debug)]
pub struct BuildContext {
    /// Options this context was built from
    pub options: BuildOptions,
    /// Absolute bootstrap directory
    pub bootstrap_dir: PathBuf,
    /// Staged platform directory (`<bootstrap>/staging`)
    pub staging_dir: PathBuf,
    /// Bluetooth source as seen through staging (`<staging>/bt`)
    pub bt_dir: PathBuf,
    /// Build output directory (`<bootstrap>/output`)
    pub output_dir: PathBuf,
    /// Install prefix (`<output>/install`)
    pub install_dir: PathBuf,
    /// Parallel jobs, resolved
    pub jobs: usize,
    /// Final use flag set
    pub use_flags: UseFlags,
    base_version: OnceCell<String>,
}

impl BuildContext {
    /// Resolve and validate a build context
    ///
    /// Creates the bootstrap and output directories when missing.
    ///
    /// # Errors
    /// * `BuildError::MissingStaging` - bootstrap never ran
    /// * `BuildError::MissingGnRoot` - staging has no `.gn`
    /// * `BuildError::StaleStaging` - staging points at another source tree
    pub fn new(options: BuildOptions) -> Result<Self, BuildError> {
        let jobs = if options.jobs > 0 {
            options.jobs
        } else {
            let jobs = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            tracing::info!("Number of jobs = {}", jobs);
            jobs
        };

        let bootstrap_dir = std::path::absolute(&options.bootstrap_dir)?;
        fs::create_dir_all(&bootstrap_dir)?;

        let staging_dir = bootstrap_dir.join("staging");
        let bt_dir = staging_dir.join("bt");
        let output_dir = bootstrap_dir.join("output");
        let install_dir = output_dir.join("install");

        if !staging_dir.is_dir() {
            return Err(BuildError::MissingStaging(staging_dir));
        }
        if !staging_dir.join(".gn").is_file() {
            return Err(BuildError::MissingGnRoot(staging_dir));
        }
        if !same_dir(&bt_dir, &options.bt_dir) {
            return Err(BuildError::StaleStaging {
                staged: bt_dir,
                bt_dir: options.bt_dir.clone(),
            });
        }

        fs::create_dir_all(&output_dir)?;

        // Unless set, always build test code
        let mut overrides = options.use_flags.clone();
        if !options.notest {
            overrides.push("test".to_string());
        }
        let use_flags = UseFlags::from_overrides(&overrides);

        Ok(Self {
            options,
            bootstrap_dir,
            staging_dir,
            bt_dir,
            output_dir,
            install_dir,
            jobs,
            use_flags,
            base_version: OnceCell::new(),
        })
    }

    /// GN output directory (`<output>/out/Default`)
    pub fn gn_output_dir(&self) -> PathBuf {
        self.output_dir.join("out").join("Default")
    }

    /// Isolated cargo home (`<output>/cargo_home`)
    pub fn cargo_home(&self) -> PathBuf {
        self.output_dir.join("cargo_home")
    }

    /// Vendored crates inside staging
    pub fn vendor_dir(&self) -> PathBuf {
        self.staging_dir.join("external").join("rust").join("vendor")
    }

    /// Library directory inside the sysroot
    pub fn libdir(&self) -> PathBuf {
        self.options.sysroot.join(&self.options.libdir)
    }

    /// Cargo profile directory binaries land in
    pub fn rust_bin_dir(&self) -> PathBuf {
        let profile = if self.options.rust_debug { "debug" } else { "release" };
        self.output_dir.join(profile)
    }

    /// Installed libchrome version, looked up once
    ///
    /// `BASE_VER` in the environment wins, then the sysroot's
    /// `usr/share/libchrome/BASE_VER`, then [`BASE_VER_NOT_INSTALLED`].
    pub fn base_version(&self) -> &str {
        self.base_version.get_or_init(|| {
            if let Ok(ver) = std::env::var("BASE_VER") {
                if !ver.is_empty() {
                    return ver;
                }
            }
            let base_file = self.options.sysroot.join("usr/share/libchrome/BASE_VER");
            match fs::read_to_string(&base_file) {
                Ok(contents) => contents.trim_matches('\n').to_string(),
                Err(e) => {
                    tracing::debug!("Could not read {}: {}", base_file.display(), e);
                    BASE_VER_NOT_INSTALLED.to_string()
                }
            }
        })
    }
}

/// True when both paths resolve to the same directory
fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
