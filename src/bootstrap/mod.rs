//! Working area setup
//!
//! Bootstrap clones the external repositories, links them together with the
//! Bluetooth source into a staging tree and reports packages the host still
//! needs. A sentinel file makes later runs update the checkouts instead.

pub mod packages;
pub mod repos;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::BuildError;
use crate::executor::CommandRunner;

pub use packages::{PackageCheck, APT, CARGO};
pub use repos::{RepoSpec, BOOTSTRAP_REPOS};

/// Default wall-clock limit for a single clone
pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 600;

/// Marker written once the first bootstrap finished
pub const SETUP_COMPLETE: &str = ".setup-complete";

const SETUP_COMPLETE_CONTENTS: &str = "Setup complete.";

/// Stages repositories for a host build
pub struct Bootstrapper<R: CommandRunner> {
    base_dir: PathBuf,
    bt_dir: PathBuf,
    partial_staging: bool,
    clone_timeout: Duration,
    runner: R,
}

impl<R: CommandRunner> Bootstrapper<R> {
    /// Create a bootstrapper staging into `base_dir`
    ///
    /// Creates `base_dir` when missing.
    ///
    /// # Errors
    /// * `BuildError::InvalidSourceDir` - `bt_dir` is not a directory
    pub fn new(
        base_dir: impl AsRef<Path>,
        bt_dir: impl AsRef<Path>,
        partial_staging: bool,
        clone_timeout: Duration,
        runner: R,
    ) -> Result<Self, BuildError> {
        let base_dir = std::path::absolute(base_dir)?;
        let bt_dir = std::path::absolute(bt_dir)?;

        fs::create_dir_all(&base_dir)?;

        if !bt_dir.is_dir() {
            return Err(BuildError::InvalidSourceDir(bt_dir));
        }

        Ok(Self {
            base_dir,
            bt_dir,
            partial_staging,
            clone_timeout,
            runner,
        })
    }

    pub fn git_dir(&self) -> PathBuf {
        self.base_dir.join("repos")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.base_dir.join("staging")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join("output")
    }

    pub fn external_dir(&self) -> PathBuf {
        self.staging_dir().join("external")
    }

    pub fn sentinel(&self) -> PathBuf {
        self.base_dir.join(SETUP_COMPLETE)
    }

    pub fn is_setup_complete(&self) -> bool {
        self.sentinel().is_file()
    }

    /// Stage the tree, then report missing packages
    pub fn bootstrap(&self) -> Result<(), BuildError> {
        self.setup()?;
        APT.report(&self.runner);
        CARGO.report(&self.runner);
        Ok(())
    }

    /// Clone and link on the first run; update checkouts afterwards
    pub fn setup(&self) -> Result<(), BuildError> {
        for dir in [
            self.git_dir(),
            self.staging_dir(),
            self.output_dir(),
            self.external_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }

        if self.is_setup_complete() {
            println!("{} already set-up. Updating instead.", self.base_dir.display());
            return self.update();
        }

        let git_dir = self.git_dir();
        for repo in BOOTSTRAP_REPOS {
            repos::clone_repo(
                &self.runner,
                &git_dir,
                repo,
                self.partial_staging,
                self.clone_timeout,
            )?;
        }

        self.link_staging()?;

        fs::write(self.sentinel(), SETUP_COMPLETE_CONTENTS)?;
        tracing::info!("Bootstrap of {} complete", self.base_dir.display());
        Ok(())
    }

    /// Update every checkout to its pin or the remote head
    pub fn update(&self) -> Result<(), BuildError> {
        let git_dir = self.git_dir();
        for repo in BOOTSTRAP_REPOS {
            repos::update_repo(&self.runner, &git_dir, repo)?;
        }
        Ok(())
    }

    fn link_staging(&self) -> Result<(), BuildError> {
        let links = repos::staging_links(
            &self.git_dir(),
            &self.staging_dir(),
            &self.external_dir(),
            &self.bt_dir,
        );
        for (target, link) in links {
            repos::replace_symlink(&target, &link)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CommandSpec, MockCommandRunner};
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(DEFAULT_CLONE_TIMEOUT_SECS);

    fn source_dir(root: &TempDir) -> PathBuf {
        let bt = root.path().join("bt");
        fs::create_dir_all(&bt).unwrap();
        bt
    }

    fn is_git(spec: &CommandSpec, sub: &str) -> bool {
        spec.program == "git" && spec.first_arg() == Some(sub)
    }

    /// Package queries that report everything installed
    fn expect_package_queries(runner: &mut MockCommandRunner) {
        runner
            .expect_output()
            .withf(|spec| spec.program == "apt")
            .returning(|_| {
                Ok(packages::REQUIRED_APT_PACKAGES
                    .iter()
                    .map(|p| format!("{}/stable,now 1.0 amd64 [installed]\n", p))
                    .collect())
            });
        runner
            .expect_output()
            .withf(|spec| spec.program == "cargo")
            .returning(|_| {
                Ok(packages::REQUIRED_CARGO_PACKAGES
                    .iter()
                    .map(|p| format!("{} v1.0.0:\n    bin\n", p))
                    .collect())
            });
    }

    #[test]
    fn test_new_rejects_missing_source() {
        let root = TempDir::new().unwrap();
        let result = Bootstrapper::new(
            root.path().join("floss"),
            root.path().join("nope"),
            false,
            TIMEOUT,
            MockCommandRunner::new(),
        );

        assert!(matches!(result, Err(BuildError::InvalidSourceDir(_))));
        // Base dir is created before the check
        assert!(root.path().join("floss").is_dir());
    }

    #[test]
    fn test_first_run_clones_links_and_marks() {
        let root = TempDir::new().unwrap();
        let bt = source_dir(&root);
        let mut runner = MockCommandRunner::new();

        runner
            .expect_run()
            .withf(|spec, timeout| is_git(spec, "clone") && timeout.is_some())
            .times(BOOTSTRAP_REPOS.len())
            .returning(|_, _| Ok(()));
        runner
            .expect_run()
            .withf(|spec, _| is_git(spec, "checkout"))
            .times(1)
            .returning(|_, _| Ok(()));
        expect_package_queries(&mut runner);

        let base = root.path().join("floss");
        let bootstrapper = Bootstrapper::new(&base, &bt, false, TIMEOUT, runner).unwrap();
        bootstrapper.bootstrap().unwrap();

        assert_eq!(
            fs::read_to_string(base.join(SETUP_COMPLETE)).unwrap(),
            "Setup complete."
        );
        assert_eq!(fs::read_link(base.join("staging/bt")).unwrap(), bt);
        assert_eq!(
            fs::read_link(base.join("staging/.gn")).unwrap(),
            base.join("repos/platform2/.gn")
        );
        assert_eq!(
            fs::read_link(base.join("staging/external/proto_logging")).unwrap(),
            base.join("repos/proto_logging")
        );
        assert!(base.join("output").is_dir());
    }

    #[test]
    fn test_rerun_only_updates() {
        let root = TempDir::new().unwrap();
        let bt = source_dir(&root);
        let base = root.path().join("floss");
        for repo in BOOTSTRAP_REPOS {
            fs::create_dir_all(base.join("repos").join(repo.name)).unwrap();
        }
        fs::write(base.join(SETUP_COMPLETE), "Setup complete.").unwrap();

        let mut runner = MockCommandRunner::new();
        runner
            .expect_stdout()
            .withf(|spec| is_git(spec, "rev-parse"))
            .times(1)
            .returning(|_| Ok(format!("{}\n", repos::COMMON_MK_COMMIT)));
        runner
            .expect_run()
            .withf(|spec, _| is_git(spec, "pull"))
            .times(2)
            .returning(|_, _| Ok(()));
        // Anything else, clone included, fails the mock

        let bootstrapper = Bootstrapper::new(&base, &bt, false, TIMEOUT, runner).unwrap();
        bootstrapper.setup().unwrap();

        // No links were made
        assert!(fs::symlink_metadata(base.join("staging/bt")).is_err());
    }

    #[test]
    fn test_rerun_with_missing_repo() {
        let root = TempDir::new().unwrap();
        let bt = source_dir(&root);
        let base = root.path().join("floss");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join(SETUP_COMPLETE), "Setup complete.").unwrap();

        let bootstrapper =
            Bootstrapper::new(&base, &bt, false, TIMEOUT, MockCommandRunner::new()).unwrap();
        let err = bootstrapper.setup().unwrap_err();

        assert!(matches!(err, BuildError::MissingRepo(_)));
    }

    #[test]
    fn test_clone_timeout_aborts_bootstrap() {
        let root = TempDir::new().unwrap();
        let bt = source_dir(&root);
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|spec, _| is_git(spec, "clone"))
            .times(repos::CLONE_TRIES)
            .returning(|spec, timeout| {
                Err(BuildError::Timeout {
                    command: spec.display(),
                    timeout_secs: timeout.map_or(0, |t| t.as_secs()),
                })
            });

        let base = root.path().join("floss");
        let bootstrapper = Bootstrapper::new(&base, &bt, true, TIMEOUT, runner).unwrap();
        let err = bootstrapper.bootstrap().unwrap_err();

        assert!(matches!(err, BuildError::Timeout { timeout_secs: 600, .. }));
        assert!(!base.join(SETUP_COMPLETE).exists());
    }
}
