//! Target execution
use crate::error::BuildResult;
use crate::flags;
use crate::info::BuildInfo;
use crate::runner::{CommandRunner, Invocation};
use crate::targets::{self, Target};
use crate::tools::Tool;

use appforge_config::Config;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of running a target
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Target that was requested
    pub target: Target,
    /// Leaf targets that ran, in execution order
    pub completed: Vec<Target>,
    /// Wall-clock time for the whole run
    #[serde(serialize_with = "serialize_secs")]
    pub total_time: Duration,
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Runs targets against one project
///
/// Holds the resolved configuration and the build metadata computed at
/// startup; both are read-only for the lifetime of the builder.
pub struct Builder<'r> {
    config: Config,
    info: BuildInfo,
    runner: &'r dyn CommandRunner,
}

impl<'r> Builder<'r> {
    /// Create a new builder
    pub fn new(config: Config, info: BuildInfo, runner: &'r dyn CommandRunner) -> Self {
        Self {
            config,
            info,
            runner,
        }
    }

    /// Resolved configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build metadata
    pub fn info(&self) -> &BuildInfo {
        &self.info
    }

    /// Tool runner
    pub fn runner(&self) -> &'r dyn CommandRunner {
        self.runner
    }

    /// Invocation of `tool` rooted at the project directory
    pub fn tool(&self, tool: Tool) -> Invocation {
        Invocation::new(self.config.tool_program(tool.name()))
            .current_dir(self.config.project_root())
    }

    /// `-tags=...` for this run
    pub fn tags(&self) -> String {
        flags::tags(&self.info.experimental)
    }

    /// `-ldflags=...` for this run
    pub fn ldflags(&self) -> String {
        flags::ldflags(self.config.package(), &self.info)
    }

    /// Application binary file name for `os`, e.g. `docker-app-windows.exe`
    pub fn binary_name(&self, os: &str) -> String {
        format!("{}-{}{}", self.config.binary(), os, exe_suffix(os))
    }

    /// End-to-end test binary file name for `os`
    pub fn e2e_binary_name(&self, os: &str) -> String {
        format!("{}-e2e-{}{}", self.config.binary(), os, exe_suffix(os))
    }

    /// Path of `file` inside the output directory, relative to the project root
    pub fn output_path(&self, file: &str) -> String {
        path_arg(&self.config.output_dir().join(file))
    }

    /// Absolute path of `relative` inside the project
    pub fn project_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.config.project_root().join(relative)
    }

    /// Call `f` once per configured operating system, stopping at the first failure
    pub fn for_each_os<F>(&self, mut f: F) -> BuildResult<()>
    where
        F: FnMut(&str) -> BuildResult<()>,
    {
        for os in self.config.os_matrix() {
            debug!(os = %os, "cross-compiling");
            f(&os)?;
        }
        Ok(())
    }

    /// Run a target and everything it is composed of
    pub fn run(&self, target: Target) -> BuildResult<RunSummary> {
        let start = Instant::now();
        let mut completed = Vec::new();
        self.execute(target, &mut completed)?;
        Ok(RunSummary {
            target,
            completed,
            total_time: start.elapsed(),
        })
    }

    fn execute(&self, target: Target, completed: &mut Vec<Target>) -> BuildResult<()> {
        let steps = target.steps();
        if !steps.is_empty() {
            debug!(step = target.name(), "composite");
            for step in steps {
                self.execute(*step, completed)?;
            }
            return Ok(());
        }

        info!(step = target.name(), "{}", target.description());
        let start = Instant::now();
        targets::run_leaf(self, target)?;
        debug!(
            step = target.name(),
            secs = start.elapsed().as_secs_f64(),
            "finished"
        );
        completed.push(target);
        Ok(())
    }
}

/// Executable suffix for `os`
pub fn exe_suffix(os: &str) -> &'static str {
    if os == "windows" {
        ".exe"
    } else {
        ""
    }
}

/// Render a relative path as a tool argument with forward slashes
pub(crate) fn path_arg(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::Experimental;
    use crate::runner::DryRunner;

    fn builder(runner: &DryRunner) -> Builder<'_> {
        let info = BuildInfo::new("abc1234", "v0.6.0", Experimental::default(), "now");
        Builder::new(Config::defaults("/src/app"), info, runner)
    }

    #[test]
    fn test_exe_suffix() {
        assert_eq!(exe_suffix("windows"), ".exe");
        assert_eq!(exe_suffix("linux"), "");
        assert_eq!(exe_suffix("darwin"), "");
    }

    #[test]
    fn test_artifact_names() {
        let runner = DryRunner::new();
        let b = builder(&runner);
        assert_eq!(b.binary_name("linux"), "docker-app-linux");
        assert_eq!(b.binary_name("windows"), "docker-app-windows.exe");
        assert_eq!(b.e2e_binary_name("darwin"), "docker-app-e2e-darwin");
        assert_eq!(b.output_path("docker-app-linux"), "bin/docker-app-linux");
    }

    #[test]
    fn test_tool_runs_in_project_root() {
        let runner = DryRunner::new();
        let b = builder(&runner);
        let inv = b.tool(Tool::Go);
        assert_eq!(inv.program, "go");
        assert_eq!(inv.dir.as_deref(), Some(Path::new("/src/app")));
    }

    #[test]
    fn test_for_each_os_stops_at_first_failure() {
        let runner = DryRunner::new();
        let b = builder(&runner);
        let mut seen = Vec::new();
        let result = b.for_each_os(|os| {
            seen.push(os.to_string());
            if os == "darwin" {
                Err(crate::error::BuildError::command_failed("go build", Some(1)))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(seen, vec!["linux", "darwin"]);
    }

    #[test]
    fn test_path_arg_uses_forward_slashes() {
        assert_eq!(path_arg(Path::new("integrations/gradle")), "integrations/gradle");
        assert_eq!(path_arg(&PathBuf::from("bin").join("x")), "bin/x");
    }
}
