//! Build target names

use std::fmt;

/// A named build target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    All,
    Bloat,
    Clean,
    Docs,
    Hosttools,
    Main,
    Prepare,
    Rust,
    Test,
    Clippy,
    Utils,
    Install,
}

impl Target {
    /// Every valid target, in the order they are listed to users
    pub const ALL: &'static [Target] = &[
        Target::All,
        Target::Bloat,
        Target::Clean,
        Target::Docs,
        Target::Hosttools,
        Target::Main,
        Target::Prepare,
        Target::Rust,
        Target::Test,
        Target::Clippy,
        Target::Utils,
        Target::Install,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Target::All => "all",
            Target::Bloat => "bloat",
            Target::Clean => "clean",
            Target::Docs => "docs",
            Target::Hosttools => "hosttools",
            Target::Main => "main",
            Target::Prepare => "prepare",
            Target::Rust => "rust",
            Target::Test => "test",
            Target::Clippy => "clippy",
            Target::Utils => "utils",
            Target::Install => "install",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Target::All => "All targets except test and clean",
            Target::Bloat => "Check bloat of crates",
            Target::Clean => "Clean up output directory",
            Target::Docs => "Build Rust docs",
            Target::Hosttools => "Build the host tools (i.e. packetgen)",
            Target::Main => "Build the main C++ codebase",
            Target::Prepare => "Prepare the output directory (gn gen + rust setup)",
            Target::Rust => "Build only the rust components",
            Target::Test => "Run the unit tests",
            Target::Clippy => "Run cargo clippy",
            Target::Utils => "Build Floss utils",
            Target::Install => "Install binaries and create a tarball",
        }
    }

    /// Look up a target by name
    pub fn parse(name: &str) -> Option<Target> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Names of every valid target
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Target::name).collect()
    }

    /// One `name  description` line per target
    pub fn listing() -> String {
        Self::ALL
            .iter()
            .map(|t| format!("  {:<10} {}\n", t.name(), t.description()))
            .collect()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
