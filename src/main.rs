//! btbuild CLI entry point
//!
//! Usage:
//!   btbuild --run-bootstrap             Stage repositories next to the source
//!   btbuild --print-env [--format json] Print the build environment
//!   btbuild [--target <name>]           Build a target (default: all)

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use btbuild::bootstrap::Bootstrapper;
use btbuild::builder::{BuildContext, Builder, EnvOverlay};
use btbuild::cli::{check_host_arch, host_arch, Cli, EnvFormat, Mode};
use btbuild::config::load_config;
use btbuild::error::BuildError;
use btbuild::executor::SystemRunner;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            if let Some(hint) = e.downcast_ref::<BuildError>().and_then(BuildError::suggestion) {
                eprintln!("{}: {}", "hint".yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    let uname_runner = SystemRunner::new(cli.bootstrap_dir(&config).join("output"));
    check_host_arch(&host_arch(&uname_runner))?;

    match cli.mode() {
        Mode::Bootstrap => run_bootstrap(&cli, &config),
        Mode::PrintEnv => print_env(&cli, &config),
        Mode::Build => build(&cli, &config),
    }
}

fn run_bootstrap(cli: &Cli, config: &btbuild::Config) -> Result<()> {
    let base_dir = cli.bootstrap_dir(config);
    let bt_dir = cli.bt_dir().context("Could not determine the current directory")?;
    let runner = SystemRunner::new(base_dir.join("output"));

    let bootstrapper = Bootstrapper::new(
        &base_dir,
        &bt_dir,
        cli.partial_staging(config),
        cli.clone_timeout(config),
        runner,
    )?;
    bootstrapper.bootstrap()?;
    Ok(())
}

fn prepare_context(cli: &Cli, config: &btbuild::Config) -> Result<(BuildContext, EnvOverlay)> {
    let options = cli
        .build_options(config)
        .context("Could not determine the current directory")?;
    let ctx = BuildContext::new(options)?;
    let env = EnvOverlay::from_context(&ctx)?;
    Ok((ctx, env))
}

fn print_env(cli: &Cli, config: &btbuild::Config) -> Result<()> {
    let (_ctx, env) = prepare_context(cli, config)?;

    match cli.format {
        EnvFormat::Shell => print!("{}", env.to_shell()),
        EnvFormat::Json => println!("{}", serde_json::to_string_pretty(&env.to_json())?),
    }
    Ok(())
}

fn build(cli: &Cli, config: &btbuild::Config) -> Result<()> {
    let (ctx, env) = prepare_context(cli, config)?;
    let runner = SystemRunner::new(&ctx.output_dir);

    Builder::new(ctx, env, runner).build(&cli.target)?;
    Ok(())
}
