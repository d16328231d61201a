//! GN and ninja command construction
//!
//! Mirrors the argument set common-mk's platform2 driver hands to `gn gen`.

use std::fmt;

use super::context::BuildContext;
use super::env::EnvOverlay;
use super::flags::UseFlags;
use crate::executor::CommandSpec;

/// Platform subdirectory GN builds from
pub const PLATFORM_SUBDIR: &str = "bt";

/// A value in a GN `--args` assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GnValue {
    Bool(bool),
    Str(String),
    List(Vec<String>),
}

impl From<bool> for GnValue {
    fn from(b: bool) -> Self {
        GnValue::Bool(b)
    }
}

impl From<&str> for GnValue {
    fn from(s: &str) -> Self {
        GnValue::Str(s.to_string())
    }
}

impl From<String> for GnValue {
    fn from(s: String) -> Self {
        GnValue::Str(s)
    }
}

impl From<Vec<String>> for GnValue {
    fn from(v: Vec<String>) -> Self {
        GnValue::List(v)
    }
}

impl fmt::Display for GnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GnValue::Bool(b) => write!(f, "{}", b),
            GnValue::Str(s) => write!(f, "{}", to_gn_string(s)),
            GnValue::List(items) => {
                let quoted: Vec<String> = items.iter().map(|s| to_gn_string(s)).collect();
                write!(f, "[{}]", quoted.join(","))
            }
        }
    }
}

/// Quote a string for GN
pub fn to_gn_string(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Render `key=value` assignments, normalizing `-` in keys to `_`
pub fn format_gn_args(args: &[(String, GnValue)]) -> Vec<String> {
    args.iter()
        .map(|(k, v)| format!("{}={}", k.replace('-', "_"), v))
        .collect()
}

/// Render the `use={...}` scope
pub fn format_use_scope(flags: &UseFlags) -> String {
    let entries: Vec<String> = flags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("use={{{}}}", entries.join(" "))
}

/// Ordered `gn gen` arguments for this build
pub fn gn_args(ctx: &BuildContext, env: &EnvOverlay) -> Vec<(String, GnValue)> {
    let clang = !ctx.options.no_clang;
    let enable_exceptions = env.var("CXXEXCEPTIONS").is_some_and(|v| v == "1");

    let mut external_cxxflags = vec!["-DNDEBUG".to_string()];
    if clang {
        external_cxxflags.push("-I/usr/include/".to_string());
    }

    let entries: Vec<(&str, GnValue)> = vec![
        ("platform_subdir", PLATFORM_SUBDIR.into()),
        ("cc", if clang { "clang" } else { "gcc" }.into()),
        ("cxx", if clang { "clang++" } else { "g++" }.into()),
        ("ar", if clang { "llvm-ar" } else { "ar" }.into()),
        ("pkg-config", "pkg-config".into()),
        ("clang_cc", clang.into()),
        ("clang_cxx", clang.into()),
        ("OS", "linux".into()),
        ("sysroot", ctx.options.sysroot.display().to_string().into()),
        ("libdir", ctx.libdir().display().to_string().into()),
        ("build_root", ctx.output_dir.display().to_string().into()),
        ("platform2_root", ctx.staging_dir.display().to_string().into()),
        ("libbase_ver", ctx.base_version().into()),
        ("enable_exceptions", enable_exceptions.into()),
        ("external_cflags", Vec::<String>::new().into()),
        ("external_cxxflags", external_cxxflags.into()),
        ("enable_werror", true.into()),
    ];

    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Use flags as GN sees them; clang builds also set `clang`
pub fn effective_use_flags(ctx: &BuildContext) -> UseFlags {
    let mut flags = ctx.use_flags.clone();
    if !ctx.options.no_clang {
        flags.set("clang", true);
    }
    flags
}

/// `gn gen` invocation for the default output directory
pub fn gn_gen_command(ctx: &BuildContext, env: &EnvOverlay) -> CommandSpec {
    let mut args_args = format_gn_args(&gn_args(ctx, env));
    args_args.push(format_use_scope(&effective_use_flags(ctx)));

    if let Some(pkg_config_path) = env.var("PKG_CONFIG_PATH") {
        tracing::debug!("PKG_CONFIG_PATH is {}", pkg_config_path.to_string_lossy());
    }

    let mut cmd = CommandSpec::new("gn").arg("gen");
    if ctx.options.verbose {
        cmd = cmd.arg("-v");
    }
    cmd.arg(format!("--root={}", ctx.staging_dir.display()))
        .arg(format!("--args={}", args_args.join(" ")))
        .arg(ctx.gn_output_dir().display().to_string())
        .in_dir(&ctx.staging_dir)
        .with_env(env.merged().clone())
}

/// ninja invocation for `bt:<target>`
pub fn ninja_command(ctx: &BuildContext, env: &EnvOverlay, target: &str) -> CommandSpec {
    let mut cmd = CommandSpec::new("ninja")
        .arg("-C")
        .arg(ctx.gn_output_dir().display().to_string());
    if ctx.jobs > 0 {
        cmd = cmd.arg("-j").arg(ctx.jobs.to_string());
    }
    cmd = cmd.arg(format!("{}:{}", PLATFORM_SUBDIR, target));
    if ctx.options.verbose {
        cmd = cmd.arg("-v");
    }
    cmd.in_dir(&ctx.staging_dir).with_env(env.merged().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::context::BuildOptions;
    use crate::builder::testing::staged_tree;
    use std::collections::BTreeMap;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn setup(
        configure: impl FnOnce(&mut BuildOptions),
        inherited: BTreeMap<OsString, OsString>,
    ) -> (tempfile::TempDir, BuildContext, EnvOverlay) {
        let (root, bootstrap, source) = staged_tree();
        let mut options = BuildOptions::new(&bootstrap, &source);
        options.jobs = 8;
        options.sysroot = root.path().join("sysroot");
        configure(&mut options);
        let ctx = BuildContext::new(options).unwrap();
        let env = EnvOverlay::with_plugin(&ctx, None, inherited).unwrap();
        (root, ctx, env)
    }

    fn lookup<'a>(args: &'a [(String, GnValue)], key: &str) -> &'a GnValue {
        &args.iter().find(|(k, _)| k == key).unwrap().1
    }

    #[test]
    fn test_to_gn_string_escapes_quotes() {
        assert_eq!(to_gn_string("plain"), "\"plain\"");
        assert_eq!(to_gn_string("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_gn_value_display() {
        assert_eq!(GnValue::Bool(true).to_string(), "true");
        assert_eq!(GnValue::Bool(false).to_string(), "false");
        assert_eq!(GnValue::from("linux").to_string(), "\"linux\"");
        assert_eq!(GnValue::List(vec![]).to_string(), "[]");
        assert_eq!(
            GnValue::from(vec!["-DNDEBUG".to_string(), "-I/usr/include/".to_string()])
                .to_string(),
            "[\"-DNDEBUG\",\"-I/usr/include/\"]"
        );
    }

    #[test]
    fn test_format_gn_args_normalizes_keys() {
        let args = vec![
            ("pkg-config".to_string(), GnValue::from("pkg-config")),
            ("clang_cc".to_string(), GnValue::Bool(true)),
        ];
        assert_eq!(
            format_gn_args(&args),
            vec!["pkg_config=\"pkg-config\"", "clang_cc=true"]
        );
    }

    #[test]
    fn test_format_use_scope() {
        let flags = UseFlags::build(&["b", "a"], &[], ["c"]);
        assert_eq!(format_use_scope(&flags), "use={a=false b=false c=true}");
    }

    #[test]
    fn test_gn_args_clang() {
        let (root, ctx, env) = setup(|_| {}, BTreeMap::new());
        let args = gn_args(&ctx, &env);

        assert_eq!(args[0].0, "platform_subdir");
        assert_eq!(args.last().unwrap().0, "enable_werror");
        assert_eq!(lookup(&args, "cc"), &GnValue::from("clang"));
        assert_eq!(lookup(&args, "cxx"), &GnValue::from("clang++"));
        assert_eq!(lookup(&args, "ar"), &GnValue::from("llvm-ar"));
        assert_eq!(lookup(&args, "clang_cc"), &GnValue::Bool(true));
        assert_eq!(
            lookup(&args, "libdir"),
            &GnValue::Str(root.path().join("sysroot/usr/lib").display().to_string())
        );
        assert_eq!(
            lookup(&args, "external_cxxflags"),
            &GnValue::List(vec!["-DNDEBUG".to_string(), "-I/usr/include/".to_string()])
        );
        assert_eq!(lookup(&args, "enable_exceptions"), &GnValue::Bool(false));
        assert!(effective_use_flags(&ctx).is_enabled("clang"));
    }

    #[test]
    fn test_gn_args_gcc() {
        let (_root, ctx, env) = setup(|o| o.no_clang = true, BTreeMap::new());
        let args = gn_args(&ctx, &env);

        assert_eq!(lookup(&args, "cc"), &GnValue::from("gcc"));
        assert_eq!(lookup(&args, "cxx"), &GnValue::from("g++"));
        assert_eq!(lookup(&args, "ar"), &GnValue::from("ar"));
        assert_eq!(lookup(&args, "clang_cxx"), &GnValue::Bool(false));
        assert_eq!(
            lookup(&args, "external_cxxflags"),
            &GnValue::List(vec!["-DNDEBUG".to_string()])
        );
        assert_eq!(effective_use_flags(&ctx).get("clang"), None);
    }

    #[test]
    fn test_gn_args_exceptions_from_env() {
        let mut inherited = BTreeMap::new();
        inherited.insert("CXXEXCEPTIONS".into(), "1".into());
        let (_root, ctx, env) = setup(|_| {}, inherited);

        let args = gn_args(&ctx, &env);
        assert_eq!(lookup(&args, "enable_exceptions"), &GnValue::Bool(true));
    }

    #[test]
    fn test_gn_gen_command() {
        let (_root, ctx, env) = setup(|o| o.verbose = true, BTreeMap::new());
        let cmd = gn_gen_command(&ctx, &env);

        assert_eq!(cmd.program, "gn");
        assert_eq!(cmd.args[0], "gen");
        assert_eq!(cmd.args[1], "-v");
        assert_eq!(cmd.args[2], format!("--root={}", ctx.staging_dir.display()));
        assert!(cmd.args[3].starts_with("--args=platform_subdir=\"bt\" cc=\"clang\""));
        assert!(cmd.args[3].contains(" pkg_config=\"pkg-config\" "));
        assert!(cmd.args[3].contains("use={"));
        assert!(cmd.args[3].contains("clang=true"));
        assert!(cmd.args[3].contains("test=true"));
        assert!(cmd.args[3].ends_with("}"));
        assert_eq!(
            PathBuf::from(&cmd.args[4]),
            ctx.output_dir.join("out/Default")
        );
        assert_eq!(cmd.cwd.as_ref(), Some(&ctx.staging_dir));
        assert_eq!(cmd.env.as_ref(), Some(env.merged()));
    }

    #[test]
    fn test_ninja_command() {
        let (_root, ctx, env) = setup(|_| {}, BTreeMap::new());
        let cmd = ninja_command(&ctx, &env, "tools");

        assert_eq!(cmd.program, "ninja");
        assert_eq!(
            cmd.args,
            vec![
                "-C".to_string(),
                ctx.gn_output_dir().display().to_string(),
                "-j".to_string(),
                "8".to_string(),
                "bt:tools".to_string(),
            ]
        );
    }

    #[test]
    fn test_ninja_command_verbose() {
        let (_root, ctx, env) = setup(|o| o.verbose = true, BTreeMap::new());
        let cmd = ninja_command(&ctx, &env, "all");
        assert_eq!(cmd.args.last().map(String::as_str), Some("-v"));
    }
}
