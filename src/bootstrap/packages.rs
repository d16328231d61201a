//! Missing package report
//!
//! Queries apt and cargo for what is installed and prints a ready-to-run
//! install command for whatever the build still needs. Nothing is installed.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::BuildError;
use crate::executor::{CommandRunner, CommandSpec};

/// System packages needed for the host build
pub const REQUIRED_APT_PACKAGES: &[&str] = &[
    "bison",
    "build-essential",
    "curl",
    "debmake",
    "flatbuffers-compiler",
    "flex",
    "g++-multilib",
    "gcc-multilib",
    "generate-ninja",
    "gnupg",
    "gperf",
    "libabsl-dev",
    "libc++abi-dev",
    "libc++-dev",
    "libdbus-1-dev",
    "libdouble-conversion-dev",
    "libevent-dev",
    "libflatbuffers-dev",
    "libfmt-dev",
    "libgl1-mesa-dev",
    "libglib2.0-dev",
    "libgtest-dev",
    "libgmock-dev",
    "liblc3-dev",
    "liblz4-tool",
    "libncurses5",
    "libnss3-dev",
    "libprotobuf-dev",
    "libre2-9",
    "libre2-dev",
    "libssl-dev",
    "libtinyxml2-dev",
    "libx11-dev",
    "libxml2-utils",
    "ninja-build",
    "openssl",
    "protobuf-compiler",
    "unzip",
    "x11proto-core-dev",
    "xsltproc",
    "zip",
    "zlib1g-dev",
];

/// Cargo-installed helpers needed for the host build
pub const REQUIRED_CARGO_PACKAGES: &[&str] =
    &["cxxbridge-cmd", "pdl-compiler", "grpcio-compiler", "cargo-bloat"];

/// Default width of the printed install command
pub const LINE_LIMIT: usize = 80;

/// `zip/jammy,now 3.0-12build2 amd64 [installed]`
static APT_INSTALLED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^/\s]+)/.*installed").unwrap());

/// `cargo-bloat v0.12.1:` or `foo v0.1.0 (/src/foo):`
static CARGO_CRATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\S+) \S.*:\s*$").unwrap());

/// One package manager to check against a required list
#[derive(Clone, Copy)]
pub struct PackageCheck {
    /// Tool name used in warnings
    pub tool: &'static str,
    /// Command listing installed packages
    pub list_cmd: &'static [&'static str],
    /// Command prefix printed for missing packages
    pub install_cmd: &'static str,
    /// Packages that must be installed
    pub required: &'static [&'static str],
    /// What the packages are called in progress messages
    pub noun: &'static str,
    /// What the packages are called when some are missing
    pub missing_noun: &'static str,
    parse: fn(&str) -> HashSet<String>,
}

/// apt system packages
pub const APT: PackageCheck = PackageCheck {
    tool: "apt",
    list_cmd: &["apt", "-qq", "list"],
    install_cmd: "sudo apt-get install",
    required: REQUIRED_APT_PACKAGES,
    noun: "packages",
    missing_noun: "system packages",
    parse: parse_apt_installed,
};

/// cargo-installed crates
pub const CARGO: PackageCheck = PackageCheck {
    tool: "cargo",
    list_cmd: &["cargo", "install", "--list"],
    install_cmd: "cargo install",
    required: REQUIRED_CARGO_PACKAGES,
    noun: "cargo packages",
    missing_noun: "cargo packages",
    parse: parse_cargo_installed,
};

impl PackageCheck {
    /// Required packages that the package manager does not report installed
    ///
    /// # Errors
    /// * `BuildError::PackageQuery` - the list command failed
    pub fn missing<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
    ) -> Result<Vec<&'static str>, BuildError> {
        let (program, args) = self.list_cmd.split_first().ok_or_else(|| {
            BuildError::Config(format!("no list command for {}", self.tool))
        })?;
        let spec = CommandSpec::new(*program).args(args.iter().copied());

        let output = runner.output(&spec).map_err(|e| BuildError::PackageQuery {
            tool: self.tool.to_string(),
            error: e.to_string(),
        })?;

        let installed = (self.parse)(&output);
        Ok(self
            .required
            .iter()
            .copied()
            .filter(|pkg| !installed.contains(*pkg))
            .collect())
    }

    /// Print what is missing; query failures only warn
    pub fn report<R: CommandRunner + ?Sized>(&self, runner: &R) {
        println!("Checking for any missing {}...", self.noun);

        let missing = match self.missing(runner) {
            Ok(missing) => missing,
            Err(e) => {
                tracing::warn!("{}", e);
                return;
            }
        };

        if missing.is_empty() {
            println!("+ All required {} are installed", self.noun);
            return;
        }

        let install = pretty_print_install(self.install_cmd, &missing, LINE_LIMIT);
        println!("Missing {}. Run the following command: ", self.missing_noun);
        println!("{}", install.join(" \\\n"));
    }
}

/// Names of packages apt lists as installed
pub fn parse_apt_installed(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| APT_INSTALLED_RE.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Crate names from `cargo install --list`; binary lines are skipped
pub fn parse_cargo_installed(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| CARGO_CRATE_RE.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Split an install command over lines of at most `line_limit` columns
///
/// The first element is the command itself; continuation lines are indented
/// by two spaces. Join with `" \\\n"` to print.
pub fn pretty_print_install(install_cmd: &str, packages: &[&str], line_limit: usize) -> Vec<String> {
    let mut install = vec![install_cmd.to_string()];
    let mut line = String::from("  ");
    // Room for the trailing " \"
    let limit = line_limit.saturating_sub(3);

    for pkg in packages {
        if line.len() + pkg.len() < limit {
            line.push_str(pkg);
            line.push(' ');
        } else {
            install.push(line);
            line = format!("  {} ", pkg);
        }
    }

    if !line.is_empty() {
        install.push(line);
    }

    install
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockCommandRunner;

    const APT_OUTPUT: &str = "\
bison/jammy,now 2:3.8.2+dfsg-1build1 amd64 [installed]
curl/jammy-updates,now 7.81.0-1ubuntu1.15 amd64 [installed,automatic]
flex/jammy 2.6.4-8build2 amd64
zip/jammy,now 3.0-12build2 amd64 [installed]
";

    const CARGO_OUTPUT: &str = "\
cargo-bloat v0.12.1:
    cargo-bloat
cxxbridge-cmd v1.0.107:
    cxxbridge
pdl-compiler v0.2.3 (/home/me/src/pdl):
    pdlc
";

    #[test]
    fn test_required_apt_packages_unique() {
        let unique: HashSet<_> = REQUIRED_APT_PACKAGES.iter().collect();
        assert_eq!(unique.len(), REQUIRED_APT_PACKAGES.len());
    }

    #[test]
    fn test_parse_apt_installed() {
        let installed = parse_apt_installed(APT_OUTPUT);

        assert!(installed.contains("bison"));
        assert!(installed.contains("curl"));
        assert!(installed.contains("zip"));
        assert!(!installed.contains("flex"));
    }

    #[test]
    fn test_parse_cargo_installed() {
        let installed = parse_cargo_installed(CARGO_OUTPUT);

        assert_eq!(installed.len(), 3);
        assert!(installed.contains("cargo-bloat"));
        assert!(installed.contains("pdl-compiler"));
        assert!(!installed.contains("cxxbridge"));
    }

    #[test]
    fn test_cargo_missing() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_output()
            .withf(|spec| spec.program == "cargo" && spec.args == ["install", "--list"])
            .times(1)
            .returning(|_| Ok(CARGO_OUTPUT.to_string()));

        assert_eq!(CARGO.missing(&runner).unwrap(), vec!["grpcio-compiler"]);
    }

    #[test]
    fn test_apt_missing_preserves_order() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_output()
            .returning(|_| Ok(APT_OUTPUT.to_string()));

        let missing = APT.missing(&runner).unwrap();
        assert_eq!(missing.len(), REQUIRED_APT_PACKAGES.len() - 3);
        assert_eq!(missing[0], "build-essential");
        assert!(!missing.contains(&"zip"));
    }

    #[test]
    fn test_query_failure_is_package_query_error() {
        let mut runner = MockCommandRunner::new();
        runner.expect_output().returning(|_| {
            Err(BuildError::SpawnFailed {
                command: "apt -qq list".to_string(),
                error: "No such file or directory".to_string(),
            })
        });

        let err = APT.missing(&runner).unwrap_err();
        assert!(matches!(err, BuildError::PackageQuery { ref tool, .. } if tool == "apt"));

        // Reporting swallows it
        APT.report(&runner);
    }

    #[test]
    fn test_pretty_print_single_line() {
        let lines = pretty_print_install("cargo install", &["cxxbridge-cmd", "pdl-compiler"], 80);
        assert_eq!(lines, vec!["cargo install", "  cxxbridge-cmd pdl-compiler "]);
    }

    #[test]
    fn test_pretty_print_wraps() {
        let packages = ["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"];
        let lines = pretty_print_install("sudo apt-get install", &packages, 30);

        // 27 usable columns: "  aaaaaaaaaa bbbbbbbbbb " is 24 long, c does not fit
        assert_eq!(
            lines,
            vec![
                "sudo apt-get install",
                "  aaaaaaaaaa bbbbbbbbbb ",
                "  cccccccccc ",
            ]
        );
    }

    #[test]
    fn test_pretty_print_lines_fit() {
        let lines = pretty_print_install("sudo apt-get install", REQUIRED_APT_PACKAGES, LINE_LIMIT);

        assert!(lines.len() > 2);
        for line in &lines[1..] {
            assert!(line.starts_with("  "));
            assert!(line.len() + 2 <= LINE_LIMIT, "too long: {:?}", line);
        }
        let joined = lines.join(" \\\n");
        for pkg in REQUIRED_APT_PACKAGES {
            assert!(joined.contains(pkg));
        }
    }
}
