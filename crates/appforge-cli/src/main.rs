use anyhow::Result;
use appforge_build::{BuildError, Target};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::*;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::{EnvConfig, Verbosity};

/// Build automation for the docker-app Go application.
///
/// Cross-compiles binaries, runs unit and end-to-end tests, lints, vendors
/// dependencies and packages release archives by driving go, tar, docker,
/// gometalinter, dep and esc.
///
/// EXAMPLES:
///     appforge all                         Build binaries and run every test
///     appforge bin --os linux              Build the linux binary only
///     appforge --experimental on bin       Build with experimental features
///     appforge --dry-run check             Show what check would run
///     appforge list                        Describe every target
///
/// ENVIRONMENT VARIABLES:
///     APPFORGE_EXPERIMENTAL  Experimental setting (overridden by --experimental)
///     APPFORGE_OS            Comma separated OS list (overridden by --os)
///     APPFORGE_LOG           Log filter, falls back to RUST_LOG
///     APPFORGE_JSON          Set to '1' for JSON output by default
///     NO_COLOR               Set to disable colored output
#[derive(Parser)]
#[command(name = "appforge")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Experimental mode; any value other than "off" enables it
    #[arg(long, global = true, value_name = "VALUE")]
    experimental: Option<String>,

    /// Comma separated operating systems to build for
    #[arg(long, global = true, value_name = "LIST")]
    os: Option<String>,

    /// Run as if started in DIR
    #[arg(short = 'C', long = "directory", global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Print the commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output (every command and timing)
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet output (warnings and errors only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// JSON output
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and test everything
    ///
    /// Runs `bin`, then `test`.
    All,

    /// Run all tests
    ///
    /// Runs `test-unit`, then `test-e2e`.
    #[command(visible_alias = "t")]
    Test,

    /// Run linters and all tests
    ///
    /// Runs `lint`, then `test`.
    #[command(visible_alias = "c")]
    Check,

    /// Remove build artifacts
    ///
    /// Deletes the output directory, `_build/` and every release archive in
    /// the project root. Missing paths are ignored.
    Clean,

    /// Run gometalinter over every package
    Lint,

    /// Refresh the vendor directory with dep
    Vendor,

    /// Cross-compile application binaries
    ///
    /// EXAMPLES:
    ///     appforge bin                        Every configured OS
    ///     appforge bin --os linux,darwin      Selected operating systems
    #[command(visible_alias = "b")]
    Bin,

    /// Cross-compile end-to-end test binaries
    E2e,

    /// Archive application and end-to-end binaries
    Tars,

    /// Run unit tests (every package outside */e2e)
    TestUnit,

    /// Run end-to-end tests
    TestE2e,

    /// Run the gradle plugin tests in a container
    ///
    /// Streams the build context into `docker build`, then runs the gradle
    /// build inside the resulting image. Needs the linux binary from `bin`.
    GradleTest,

    /// Regenerate embedded JSON schemas (needs esc)
    Schemas,

    /// List available targets
    ///
    /// EXAMPLES:
    ///     appforge list             Human readable
    ///     appforge list --json      Machine readable
    #[command(visible_alias = "ls")]
    List,

    /// Generate shell completion scripts
    ///
    /// EXAMPLES:
    ///     appforge completions bash > ~/.local/share/bash-completion/completions/appforge
    ///     appforge completions zsh > ~/.zfunc/_appforge
    ///     appforge completions fish > ~/.config/fish/completions/appforge.fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// Build target this command runs, if any
    fn target(&self) -> Option<Target> {
        match self {
            Self::All => Some(Target::All),
            Self::Test => Some(Target::Test),
            Self::Check => Some(Target::Check),
            Self::Clean => Some(Target::Clean),
            Self::Lint => Some(Target::Lint),
            Self::Vendor => Some(Target::Vendor),
            Self::Bin => Some(Target::Bin),
            Self::E2e => Some(Target::E2e),
            Self::Tars => Some(Target::Tars),
            Self::TestUnit => Some(Target::TestUnit),
            Self::TestE2e => Some(Target::TestE2e),
            Self::GradleTest => Some(Target::GradleTest),
            Self::Schemas => Some(Target::Schemas),
            Self::List | Self::Completions { .. } => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let env_config = EnvConfig::from_env();

    let no_color = cli.no_color || env_config.no_color;
    if no_color {
        colored::control::set_override(false);
    }
    init_tracing(
        env_config.log_filter(Verbosity::from_flags(cli.verbose, cli.quiet)),
        !no_color,
    );

    match dispatch(cli, &env_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(exit_status(&e))
        }
    }
}

fn dispatch(cli: Cli, env_config: &EnvConfig) -> Result<()> {
    // Command-line flag overrides environment variable
    let json = cli.json || env_config.default_json;

    if let Some(target) = cli.command.target() {
        let args = commands::build::BuildArgs {
            target,
            project_dir: cli.directory,
            experimental: cli.experimental,
            os: cli.os,
            dry_run: cli.dry_run,
            quiet: cli.quiet,
            json,
        };
        return commands::build::run(args);
    }

    match cli.command {
        Commands::List => commands::list::run(json)?,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
        _ => {}
    }
    Ok(())
}

/// Logs go to stderr so stdout stays clean for summaries and JSON
fn init_tracing(filter: &str, ansi: bool) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(io::stderr)
        .try_init();
}

/// Failed tool exit codes pass through; everything else is 1
fn exit_status(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<BuildError>()
        .map(BuildError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}
