//! Common test utilities for btbuild tests

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A bootstrapped layout without any real repositories
pub struct StagedTree {
    pub root: TempDir,
    pub bootstrap_dir: PathBuf,
    pub bt_dir: PathBuf,
}

impl StagedTree {
    pub fn output_dir(&self) -> PathBuf {
        self.bootstrap_dir.join("output")
    }

    /// `btbuild` pointed at this tree, run from the scratch root
    pub fn btbuild(&self) -> Command {
        let mut cmd = btbuild_in(self.root.path());
        cmd.arg("--bootstrap-dir")
            .arg(&self.bootstrap_dir)
            .arg("--bt-dir")
            .arg(&self.bt_dir);
        cmd
    }
}

/// Creates `<root>/floss/staging` with a `.gn` and `bt` linked to `<root>/bt`
pub fn create_staged_tree() -> StagedTree {
    let root = TempDir::new().expect("Failed to create temp dir");
    let bt_dir = root.path().join("bt");
    let bootstrap_dir = root.path().join("floss");
    let staging = bootstrap_dir.join("staging");

    std::fs::create_dir_all(&bt_dir).expect("Failed to create bt dir");
    std::fs::create_dir_all(&staging).expect("Failed to create staging dir");
    std::fs::write(staging.join(".gn"), "").expect("Failed to write .gn");
    std::os::unix::fs::symlink(&bt_dir, staging.join("bt")).expect("Failed to link bt");

    StagedTree {
        root,
        bootstrap_dir,
        bt_dir,
    }
}

/// `btbuild` run from `dir`, isolated from the caller's configuration
pub fn btbuild_in(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("btbuild").expect("Failed to find btbuild binary");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("FLOSS_BT_DIR");
    cmd
}
