//! Build command - run a named target against the project

use anyhow::{Context, Result};
use appforge_build::{
    BuildInfo, Builder, CommandRunner, Config, DryRunner, RunSummary, SystemRunner, Target, Tool,
};
use appforge_config::loader::split_os_list;
use appforge_config::ConfigLoader;
use colored::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Placeholder git answers when nothing is executed
const DRY_RUN_GIT_OUTPUT: &str = "unknown";

/// Placeholder package listing so `test-unit` still shows its `go test` line
const DRY_RUN_PACKAGE_LISTING: &str = "./...\n";

/// Build command arguments
#[derive(Debug, Clone)]
pub struct BuildArgs {
    /// Target to run
    pub target: Target,
    /// Directory to start the project search from (defaults to current directory)
    pub project_dir: Option<PathBuf>,
    /// Experimental setting from the command line
    pub experimental: Option<String>,
    /// Comma separated OS list from the command line
    pub os: Option<String>,
    /// Record commands instead of running them
    pub dry_run: bool,
    /// Suppress the summary
    pub quiet: bool,
    /// JSON summary
    pub json: bool,
}

impl BuildArgs {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            project_dir: None,
            experimental: None,
            os: None,
            dry_run: false,
            quiet: false,
            json: false,
        }
    }
}

/// Run the build command
pub fn run(args: BuildArgs) -> Result<()> {
    let config = load_config(
        args.project_dir.as_deref(),
        args.experimental.as_deref(),
        args.os.as_deref(),
    )?;

    let runner = determine_runner(&config, args.dry_run);
    let info = BuildInfo::collect(&config, runner.as_ref())
        .context("Failed to read version information from git")?;
    debug!(
        commit = %info.commit,
        version = %info.version,
        experimental = %info.experimental,
        build_time = %info.build_time,
        "build info"
    );

    let builder = Builder::new(config, info, runner.as_ref());
    let summary = builder
        .run(args.target)
        .with_context(|| format!("Target '{}' failed", args.target))?;

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else if !args.quiet {
        print_summary(&summary, args.dry_run);
    }

    Ok(())
}

/// Resolve project settings: file and environment first, then command-line overrides
pub fn load_config(
    project_dir: Option<&Path>,
    experimental: Option<&str>,
    os: Option<&str>,
) -> Result<Config> {
    let start = match project_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let start = start
        .canonicalize()
        .with_context(|| format!("Project directory not found: {}", start.display()))?;

    let mut config = ConfigLoader::new()
        .load_from_directory(&start)
        .context("Failed to load project configuration")?;
    if !config.is_project() {
        debug!(root = %start.display(), "no appforge.toml found, using defaults");
    }

    if let Some(experimental) = experimental {
        config = config.with_experimental(experimental);
    }
    if let Some(os) = os {
        config = config
            .with_os(split_os_list(os))
            .context("Invalid --os value")?;
    }
    Ok(config)
}

/// Real processes, or a recorder that logs what would run
///
/// Scripted answers are keyed by the configured program names, so `[tools]`
/// overrides still get them.
fn determine_runner(config: &Config, dry_run: bool) -> Box<dyn CommandRunner> {
    if dry_run {
        let git = config.tool_program(Tool::Git.name());
        let go = config.tool_program(Tool::Go.name());
        Box::new(
            DryRunner::new()
                .announcing(true)
                .with_output(git, "rev-parse", DRY_RUN_GIT_OUTPUT)
                .with_output(git, "describe", DRY_RUN_GIT_OUTPUT)
                .with_output(go, "list", DRY_RUN_PACKAGE_LISTING),
        )
    } else {
        Box::new(SystemRunner::new())
    }
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    let verb = if dry_run { "Dry run of" } else { "Finished" };
    println!(
        "{} {} in {:.2}s",
        verb.green().bold(),
        summary.target.to_string().bold(),
        summary.total_time.as_secs_f64()
    );
    if summary.target.is_composite() {
        let steps: Vec<&str> = summary.completed.iter().map(Target::name).collect();
        println!("  {} {}", "steps:".dimmed(), steps.join(", "));
    }
}
