//! Toolchain environment overlay
//!
//! The overlay is computed once per invocation and layered over a snapshot
//! of our own environment. Every build step gets the merged result
//! explicitly instead of relying on process-global state.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;

use super::context::BuildContext;

/// Tool located on PATH for gRPC code generation
pub const GRPC_PLUGIN: &str = "grpc_rust_plugin";

/// Compiler flags for every Rust build
pub fn generate_rustflags(gn_output_dir: &Path) -> String {
    let link_dir = gn_output_dir.display().to_string();
    [
        "-L",
        link_dir.as_str(),
        "-C",
        "link-arg=-Wl,--allow-multiple-definition",
        // exclude uninteresting warnings
        "-A improper_ctypes_definitions -A improper_ctypes -A unknown_lints",
        "-Cstrip=debuginfo",
        "-Copt-level=z",
    ]
    .join(" ")
}

/// Build-specific environment variables merged over the inherited ones
#[derive(Debug, Clone)]
pub struct EnvOverlay {
    /// Overlay entries in definition order; `None` means unresolved
    vars: Vec<(String, Option<String>)>,
    /// Inherited environment with the overlay applied
    merged: BTreeMap<OsString, OsString>,
}

impl EnvOverlay {
    /// Build the overlay for `ctx`, resolving the plugin on PATH
    ///
    /// Creates `<cargo_home>/bin` when missing.
    pub fn from_context(ctx: &BuildContext) -> Result<Self, BuildError> {
        let plugin = which::which(GRPC_PLUGIN).ok();
        if plugin.is_none() {
            tracing::debug!("{} not found on PATH", GRPC_PLUGIN);
        }
        Self::with_plugin(ctx, plugin, inherited_env())
    }

    /// Build the overlay with an explicit plugin path and base environment
    pub fn with_plugin(
        ctx: &BuildContext,
        plugin: Option<PathBuf>,
        inherited: BTreeMap<OsString, OsString>,
    ) -> Result<Self, BuildError> {
        let cargo_home = ctx.cargo_home();
        fs::create_dir_all(cargo_home.join("bin"))?;

        let path = |p: &Path| Some(p.display().to_string());
        let vars = vec![
            ("CARGO_TARGET_DIR".to_string(), path(&ctx.output_dir)),
            ("CARGO_HOME".to_string(), path(&cargo_home)),
            (
                "RUSTFLAGS".to_string(),
                Some(generate_rustflags(&ctx.gn_output_dir())),
            ),
            ("CXX_ROOT_PATH".to_string(), path(&ctx.staging_dir.join("bt"))),
            (
                "CROS_SYSTEM_API_ROOT".to_string(),
                path(&ctx.staging_dir.join("system_api")),
            ),
            ("CXX_OUTDIR".to_string(), path(&ctx.gn_output_dir())),
            (
                "GRPC_RUST_PLUGIN_PATH".to_string(),
                plugin.map(|p| p.display().to_string()),
            ),
        ];

        let mut merged = inherited;
        for (key, value) in &vars {
            merged.insert(key.into(), value.clone().unwrap_or_default().into());
        }

        Ok(Self { vars, merged })
    }

    /// Overlay value, with unresolved entries reported as empty
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref().unwrap_or_default())
    }

    /// Overlay entries in definition order
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref().unwrap_or_default()))
    }

    /// Complete child environment
    pub fn merged(&self) -> &BTreeMap<OsString, OsString> {
        &self.merged
    }

    /// Value of `key` in the child environment
    pub fn var(&self, key: &str) -> Option<&OsStr> {
        self.merged.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    /// `export KEY='value'` lines for shells
    pub fn to_shell(&self) -> String {
        self.vars()
            .map(|(k, v)| format!("export {}='{}'\n", k, v.replace('\'', r"'\''")))
            .collect()
    }

    /// JSON object of the overlay
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .vars()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Snapshot of our environment, bytes preserved
pub fn inherited_env() -> BTreeMap<OsString, OsString> {
    std::env::vars_os().collect()
}
