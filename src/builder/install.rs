//! Install tree and tarball

use std::fs;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::BuildError;

/// Name of the tarball written into the install directory
pub const TARBALL_NAME: &str = "floss.tar.gz";

/// A binary to copy into the install tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEntry {
    /// Built artifact
    pub src: PathBuf,
    /// Destination relative to the install directory
    pub dst: PathBuf,
    /// Strip debug symbols after copying
    pub strip: bool,
}

/// Daemons and tools shipped from `bindir`
pub fn install_entries(bindir: &Path) -> Vec<InstallEntry> {
    [
        ("btadapterd", "usr/libexec/bluetooth/btadapterd"),
        ("btmanagerd", "usr/libexec/bluetooth/btmanagerd"),
        ("btclient", "usr/local/bin/btclient"),
    ]
    .into_iter()
    .map(|(name, dst)| InstallEntry {
        src: bindir.join(name),
        dst: PathBuf::from(dst),
        strip: true,
    })
    .collect()
}

/// Copy `entry` under `prefix`, creating parent directories
///
/// Returns the absolute destination.
pub fn install_file(prefix: &Path, entry: &InstallEntry) -> Result<PathBuf, BuildError> {
    let dst = prefix.join(&entry.dst);
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    println!("Installing {}", dst.display());
    fs::copy(&entry.src, &dst)?;
    Ok(dst)
}

/// Archive every installed entry into `<prefix>/floss.tar.gz`
///
/// Entries are stored under their relative destination paths.
pub fn create_tarball(prefix: &Path, entries: &[InstallEntry]) -> Result<PathBuf, BuildError> {
    let tar_path = prefix.join(TARBALL_NAME);
    let file = fs::File::create(&tar_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = tar::Builder::new(encoder);

    for entry in entries {
        archive.append_path_with_name(prefix.join(&entry.dst), &entry.dst)?;
    }

    archive.into_inner()?.finish()?;
    Ok(tar_path)
}
