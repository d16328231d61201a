//! Repositories staged next to the Bluetooth source

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::BuildError;
use crate::executor::{CommandRunner, CommandSpec};

/// common-mk revision the build is known to work with
pub const COMMON_MK_COMMIT: &str = "d014d561eaf5ece08166edd98b10c145ef81312d";

/// Attempts per clone before a timeout is fatal
pub const CLONE_TRIES: usize = 2;

/// Treeless clone used for partial staging
pub const PARTIAL_CLONE_FILTER: &str = "--filter=tree:0";

/// An external repository and the commit to pin it to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoSpec {
    /// Directory name under `repos/`
    pub name: &'static str,
    pub url: &'static str,
    /// Pinned commit; `None` tracks the remote head
    pub commit: Option<&'static str>,
}

/// Every repository bootstrap clones
pub const BOOTSTRAP_REPOS: &[RepoSpec] = &[
    RepoSpec {
        name: "platform2",
        url: "https://chromium.googlesource.com/chromiumos/platform2",
        commit: Some(COMMON_MK_COMMIT),
    },
    RepoSpec {
        name: "rust_crates",
        url: "https://chromium.googlesource.com/chromiumos/third_party/rust_crates",
        commit: None,
    },
    RepoSpec {
        name: "proto_logging",
        url: "https://android.googlesource.com/platform/frameworks/proto_logging",
        commit: None,
    },
];

fn git(cwd: &Path) -> CommandSpec {
    CommandSpec::new("git").in_dir(cwd)
}

/// Clone `repo` into `git_dir`, retrying after a timeout
///
/// A timed-out attempt leaves a partial checkout behind; it is removed
/// before the next try. Any other failure is returned immediately.
///
/// # Errors
/// * `BuildError::Timeout` - the final attempt also timed out
pub fn clone_repo<R: CommandRunner + ?Sized>(
    runner: &R,
    git_dir: &Path,
    repo: &RepoSpec,
    partial: bool,
    timeout: Duration,
) -> Result<(), BuildError> {
    let mut cmd = git(git_dir).args(["clone", repo.url, repo.name]);
    if partial {
        cmd = cmd.arg(PARTIAL_CLONE_FILTER);
    }

    for attempt in 1..=CLONE_TRIES {
        println!("Running command: {} [at cwd={}]", cmd.display(), git_dir.display());
        match runner.run(&cmd, Some(timeout)) {
            Ok(()) => break,
            Err(e @ BuildError::Timeout { .. }) => {
                eprintln!("Timeout on {}", cmd.display());
                remove_partial_checkout(&git_dir.join(repo.name))?;
                if attempt == CLONE_TRIES {
                    return Err(e);
                }
                tracing::info!("Retrying clone of {} ({}/{})", repo.name, attempt + 1, CLONE_TRIES);
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(commit) = repo.commit {
        runner.run(&git(&git_dir.join(repo.name)).args(["checkout", commit]), None)?;
    }
    Ok(())
}

fn remove_partial_checkout(path: &Path) -> Result<(), BuildError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Bring an existing checkout up to date
///
/// Pinned repositories only fetch when `HEAD` is not already the pin.
///
/// # Errors
/// * `BuildError::MissingRepo` - the checkout is gone
pub fn update_repo<R: CommandRunner + ?Sized>(
    runner: &R,
    git_dir: &Path,
    repo: &RepoSpec,
) -> Result<(), BuildError> {
    let cwd = git_dir.join(repo.name);
    if !cwd.is_dir() {
        return Err(BuildError::MissingRepo(cwd));
    }

    match repo.commit {
        Some(commit) => {
            let head = runner.stdout(&git(&cwd).args(["rev-parse", "HEAD"]))?;
            if head.trim() != commit {
                runner.run(&git(&cwd).arg("fetch"), None)?;
                runner.run(&git(&cwd).args(["checkout", commit]), None)?;
            } else {
                tracing::debug!("{} already at {}", repo.name, commit);
            }
        }
        None => runner.run(&git(&cwd).arg("pull"), None)?,
    }
    Ok(())
}

/// `(target, link)` pairs that assemble the staging tree
pub fn staging_links(
    git_dir: &Path,
    staging_dir: &Path,
    external_dir: &Path,
    bt_dir: &Path,
) -> Vec<(PathBuf, PathBuf)> {
    let platform2 = git_dir.join("platform2");
    vec![
        (platform2.join("common-mk"), staging_dir.join("common-mk")),
        (platform2.join("system_api"), staging_dir.join("system_api")),
        (platform2.join(".gn"), staging_dir.join(".gn")),
        (bt_dir.to_path_buf(), staging_dir.join("bt")),
        (git_dir.join("rust_crates"), external_dir.join("rust")),
        (git_dir.join("proto_logging"), external_dir.join("proto_logging")),
    ]
}

/// Point `link` at `target`, replacing whatever link was there
pub fn replace_symlink(target: &Path, link: &Path) -> Result<(), BuildError> {
    if let Err(e) = fs::remove_file(link) {
        tracing::debug!("No previous link at {}: {}", link.display(), e);
    }
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}
