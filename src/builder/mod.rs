//! Host build driver
//!
//! A [`Builder`] owns a validated [`BuildContext`], the environment overlay
//! computed from it and a [`CommandRunner`]. Each target is a fixed sequence
//! of external invocations; the first failure stops the target.

pub mod context;
pub mod env;
pub mod flags;
pub mod gn;
pub mod install;
pub mod targets;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::BuildError;
use crate::executor::{CommandRunner, CommandSpec};

pub use context::{BuildContext, BuildOptions};
pub use env::EnvOverlay;
pub use flags::UseFlags;
pub use targets::Target;

/// Generated tool published into the cargo home by `hosttools`
pub const PACKETGEN: &str = "bluetooth_packetgen";

/// Utility crates built by the `utils` target
pub const UTIL_CRATES: &[&str] = &["hcidoc"];

/// Crates inspected by the `bloat` target, relative to the staged source
pub const BLOAT_CRATES: &[&str] = &[
    "system/gd/rust/linux/mgmt",
    "system/gd/rust/linux/service",
    "system/gd/rust/linux/client",
];

/// Lock files `clean` removes, relative to the staged source
const GENERATED_LOCK_FILES: &[&str] = &["Cargo.lock"];

/// Name of the crates.io replacement source
const VENDORED_SOURCE: &str = "systembt";

/// `[source.*]` tables of a cargo config file
#[derive(Debug, Serialize)]
struct CargoSourceConfig {
    source: BTreeMap<&'static str, CargoSource>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
struct CargoSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replace_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_registry: Option<String>,
}

/// Runs build targets against a staged tree
pub struct Builder<R: CommandRunner> {
    ctx: BuildContext,
    env: EnvOverlay,
    runner: R,
    /// Native test binaries under the GN output directory
    host_tests: Vec<String>,
}

impl<R: CommandRunner> Builder<R> {
    pub fn new(ctx: BuildContext, env: EnvOverlay, runner: R) -> Self {
        Self {
            ctx,
            env,
            runner,
            host_tests: Vec::new(),
        }
    }

    /// Replace the list of native host tests run by `test`
    pub fn with_host_tests<I, S>(mut self, tests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.host_tests = tests.into_iter().map(Into::into).collect();
        self
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn env(&self) -> &EnvOverlay {
        &self.env
    }

    /// Build the named target
    ///
    /// An unknown name lists the valid targets and returns `Ok`.
    pub fn build(&self, name: &str) -> Result<(), BuildError> {
        println!("Building target {}", name);

        let Some(target) = Target::parse(name) else {
            println!(
                "Target {} is not valid. Must be in {:?}",
                name,
                Target::names()
            );
            print!("{}", Target::listing());
            return Ok(());
        };

        self.run_target(target)
    }

    pub fn run_target(&self, target: Target) -> Result<(), BuildError> {
        tracing::debug!("Running target {}", target);
        match target {
            Target::Prepare => self.prepare(),
            Target::Hosttools => self.hosttools(),
            Target::Rust => self.rust(),
            Target::Docs => self.docs(),
            Target::Main => self.main(),
            Target::Test => self.test(),
            Target::Clippy => self.clippy(),
            Target::Utils => self.utils(),
            Target::Install => self.install(),
            Target::Bloat => self.bloat(),
            Target::Clean => self.clean(),
            Target::All => self.all(),
        }
    }

    /// Command with the overlay environment, run from `cwd`
    fn command(&self, program: impl Into<String>, cwd: &Path) -> CommandSpec {
        CommandSpec::new(program)
            .in_dir(cwd)
            .with_env(self.env.merged().clone())
    }

    fn cargo(&self, cwd: &Path) -> CommandSpec {
        self.command("cargo", cwd)
    }

    fn release_flag(&self) -> Option<&'static str> {
        (!self.ctx.options.rust_debug).then_some("--release")
    }

    /// `gn gen` then the vendored crate redirect
    pub fn prepare(&self) -> Result<(), BuildError> {
        self.runner
            .run_logged("configure", &gn::gn_gen_command(&self.ctx, &self.env))?;
        self.rust_configure()
    }

    /// Point cargo at the vendored crates in staging
    fn rust_configure(&self) -> Result<(), BuildError> {
        if self.ctx.options.no_vendored_rust {
            tracing::debug!("Vendored crates disabled; leaving cargo config alone");
            return Ok(());
        }

        let mut source = BTreeMap::new();
        source.insert(
            VENDORED_SOURCE,
            CargoSource {
                directory: Some(self.ctx.vendor_dir().display().to_string()),
                ..Default::default()
            },
        );
        source.insert(
            "crates-io",
            CargoSource {
                replace_with: Some(VENDORED_SOURCE.to_string()),
                local_registry: Some("/nonexistent".to_string()),
                ..Default::default()
            },
        );
        let contents = toml::to_string(&CargoSourceConfig { source })
            .map_err(|e| BuildError::Config(e.to_string()))?;

        let cargo_home = self.ctx.cargo_home();
        fs::create_dir_all(&cargo_home)?;
        let path = cargo_home.join("config.toml");
        fs::write(&path, contents)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Build the GN `tools` target and publish the packet generator
    pub fn hosttools(&self) -> Result<(), BuildError> {
        self.runner
            .run_logged("build", &gn::ninja_command(&self.ctx, &self.env, "tools"))?;

        let bin_dir = self.ctx.cargo_home().join("bin");
        fs::create_dir_all(&bin_dir)?;
        fs::copy(
            self.ctx.gn_output_dir().join(PACKETGEN),
            bin_dir.join(PACKETGEN),
        )?;
        Ok(())
    }

    pub fn rust(&self) -> Result<(), BuildError> {
        let cmd = self.cargo(&self.ctx.bt_dir).arg("build").args(self.release_flag());
        self.runner.run_logged("rust", &cmd)
    }

    pub fn docs(&self) -> Result<(), BuildError> {
        let cmd = self.cargo(&self.ctx.bt_dir).arg("doc");
        self.runner.run_logged("docs", &cmd)
    }

    pub fn main(&self) -> Result<(), BuildError> {
        self.runner
            .run_logged("build", &gn::ninja_command(&self.ctx, &self.env, "all"))
    }

    /// Rust tests, then each configured host test binary
    pub fn test(&self) -> Result<(), BuildError> {
        let mut cmd = self.cargo(&self.ctx.bt_dir).arg("test").args(self.release_flag());
        if let Some(ref name) = self.ctx.options.test_name {
            cmd = cmd.args([name.as_str(), "--", "--test-threads=1", "--nocapture"]);
        }
        self.runner.run_logged("test", &cmd)?;

        for test in &self.host_tests {
            let binary = self.ctx.gn_output_dir().join(test);
            let cmd = self.command(binary.display().to_string(), &self.ctx.output_dir);
            self.runner.run_logged("test", &cmd)?;
        }
        Ok(())
    }

    pub fn clippy(&self) -> Result<(), BuildError> {
        let cmd = self.cargo(&self.ctx.bt_dir).arg("clippy");
        self.runner.run_logged("clippy", &cmd)
    }

    pub fn utils(&self) -> Result<(), BuildError> {
        for krate in UTIL_CRATES {
            let cmd = self.cargo(&self.ctx.bt_dir).args(["build", "-p", *krate]);
            self.runner.run_logged("utils", &cmd)?;
        }
        Ok(())
    }

    /// Copy, strip and archive the shipped binaries
    pub fn install(&self) -> Result<(), BuildError> {
        let prefix = &self.ctx.install_dir;
        fs::create_dir_all(prefix)?;

        let entries = install::install_entries(&self.ctx.rust_bin_dir());
        for entry in &entries {
            let dst = install::install_file(prefix, entry)?;

            // Skipping strip keeps symbols around for debugging
            if entry.strip && !self.ctx.options.no_strip {
                let cmd = self
                    .command("llvm-strip", prefix)
                    .arg(dst.display().to_string());
                self.runner.run_logged("install", &cmd)?;
            }
        }

        let tar_path = install::create_tarball(prefix, &entries)?;
        println!("Tarball created at {}", tar_path.display());
        Ok(())
    }

    pub fn bloat(&self) -> Result<(), BuildError> {
        for krate in BLOAT_CRATES {
            let cmd = self
                .cargo(&self.ctx.bt_dir.join(krate))
                .args(["bloat", "--release", "--crates", "--wide"]);
            self.runner.run_logged("bloat", &cmd)?;
        }
        Ok(())
    }

    /// Delete the output directory and generated lock files
    pub fn clean(&self) -> Result<(), BuildError> {
        match fs::remove_dir_all(&self.ctx.output_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        for lock_file in self.lock_files() {
            match fs::remove_file(&lock_file) {
                Ok(()) => println!("Removed {}", lock_file.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Could not remove {}: {}", lock_file.display(), e),
            }
        }
        Ok(())
    }

    fn lock_files(&self) -> Vec<PathBuf> {
        GENERATED_LOCK_FILES
            .iter()
            .map(|f| self.ctx.bt_dir.join(f))
            .collect()
    }

    /// Everything except docs, test and clean
    pub fn all(&self) -> Result<(), BuildError> {
        self.prepare()?;
        self.hosttools()?;
        self.main()?;
        self.rust()
    }
}
