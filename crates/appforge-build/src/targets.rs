/// Named build targets
use crate::builder::{path_arg, Builder};
use crate::error::{BuildError, BuildResult};
use crate::packages::partition_packages;
use crate::pipe::{pipe, DEFAULT_CAPACITY};
use crate::tools::Tool;
use serde::Serialize;
use std::fs;
use std::io;
use std::thread;
use tracing::{debug, warn};

/// Command run inside the gradle test image
pub const GRADLE_TEST_SCRIPT: &str =
    "ls -la && ./gradlew --stacktrace build && cd example && gradle renderIt";

/// Directories removed by `clean`, relative to the project root
const CLEAN_DIRS: &[&str] = &["_build"];

/// A named build target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Build and test everything
    All,
    /// Run all tests
    Test,
    /// Run linters and all tests
    Check,
    /// Remove build artifacts
    Clean,
    /// Run linters
    Lint,
    /// Refresh vendored dependencies
    Vendor,
    /// Cross-compile application binaries
    Bin,
    /// Cross-compile end-to-end test binaries
    E2e,
    /// Archive application and end-to-end binaries
    Tars,
    /// Run unit tests
    TestUnit,
    /// Run end-to-end tests
    TestE2e,
    /// Run the gradle plugin end-to-end tests in a container
    GradleTest,
    /// Regenerate embedded JSON schemas
    Schemas,
}

impl Target {
    /// Every target, in the order `list` shows them
    pub const ALL: [Target; 13] = [
        Target::All,
        Target::Test,
        Target::Check,
        Target::Clean,
        Target::Lint,
        Target::Vendor,
        Target::Bin,
        Target::E2e,
        Target::Tars,
        Target::TestUnit,
        Target::TestE2e,
        Target::GradleTest,
        Target::Schemas,
    ];

    /// Command-line name
    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Test => "test",
            Self::Check => "check",
            Self::Clean => "clean",
            Self::Lint => "lint",
            Self::Vendor => "vendor",
            Self::Bin => "bin",
            Self::E2e => "e2e",
            Self::Tars => "tars",
            Self::TestUnit => "test-unit",
            Self::TestE2e => "test-e2e",
            Self::GradleTest => "gradle-test",
            Self::Schemas => "schemas",
        }
    }

    /// One-line summary
    pub fn description(&self) -> &'static str {
        match self {
            Self::All => "Builds and tests everything",
            Self::Test => "Runs all tests",
            Self::Check => "Runs linters and all tests",
            Self::Clean => "Cleans build artifacts",
            Self::Lint => "Runs linters",
            Self::Vendor => "Updates vendoring",
            Self::Bin => "Builds application binaries",
            Self::E2e => "Builds end to end test binaries",
            Self::Tars => "Creates tar archives with application and end to end test binaries",
            Self::TestUnit => "Runs unit tests",
            Self::TestE2e => "Runs end to end tests",
            Self::GradleTest => "Runs end to end tests for the gradle plugin",
            Self::Schemas => "Generates specification/bindata.go from json schemas",
        }
    }

    /// Sub-targets of a composite target, in execution order; empty for leaves
    pub fn steps(&self) -> &'static [Target] {
        match self {
            Self::All => &[Target::Bin, Target::Test],
            Self::Test => &[Target::TestUnit, Target::TestE2e],
            Self::Check => &[Target::Lint, Target::Test],
            _ => &[],
        }
    }

    /// Whether this target only sequences other targets
    pub fn is_composite(&self) -> bool {
        !self.steps().is_empty()
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Target {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase().replace('_', "-");
        Target::ALL
            .iter()
            .copied()
            .find(|t| t.name() == wanted || t.name().replace('-', "") == wanted)
            .ok_or_else(|| BuildError::UnknownTarget(s.to_string()))
    }
}

/// Dispatch a leaf target
pub(crate) fn run_leaf(b: &Builder<'_>, target: Target) -> BuildResult<()> {
    match target {
        Target::Clean => clean(b),
        Target::Lint => lint(b),
        Target::Vendor => vendor(b),
        Target::Bin => bin(b),
        Target::E2e => e2e(b),
        Target::Tars => tars(b),
        Target::TestUnit => test_unit(b),
        Target::TestE2e => test_e2e(b),
        Target::GradleTest => gradle_test(b),
        Target::Schemas => schemas(b),
        Target::All | Target::Test | Target::Check => unreachable!("composite target {}", target),
    }
}

fn clean(b: &Builder<'_>) -> BuildResult<()> {
    let runner = b.runner();
    runner.remove(&b.project_path(b.config().output_dir()))?;
    for dir in CLEAN_DIRS {
        runner.remove(&b.project_path(dir))?;
    }

    let root = b.config().project_root();
    let prefix = format!("{}-", b.config().binary());
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(BuildError::io(root, e)),
    };
    let mut archives: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".tar.gz"))
        })
        .collect();
    archives.sort();
    for archive in archives {
        runner.remove(&archive)?;
    }
    Ok(())
}

fn lint(b: &Builder<'_>) -> BuildResult<()> {
    let config = format!("--config={}", path_arg(&b.config().lint_config()));
    b.runner()
        .run(&b.tool(Tool::GoMetaLinter).args([config.as_str(), "./..."]))
}

fn vendor(b: &Builder<'_>) -> BuildResult<()> {
    b.runner().remove(&b.project_path("vendor"))?;
    b.runner().run(&b.tool(Tool::Dep).args(["ensure", "-v"]))
}

fn bin(b: &Builder<'_>) -> BuildResult<()> {
    let binary = b.config().binary();
    b.for_each_os(|os| {
        let invocation = b
            .tool(Tool::Go)
            .env("GOOS", os)
            .env("CGO_ENABLED", "0")
            .args(["build".to_string(), b.tags(), b.ldflags()])
            .args(["-o".to_string(), b.output_path(&b.binary_name(os))])
            .arg(format!("./cmd/{}", binary));
        b.runner().run(&invocation)
    })
}

fn e2e(b: &Builder<'_>) -> BuildResult<()> {
    b.for_each_os(|os| {
        let invocation = b
            .tool(Tool::Go)
            .env("GOOS", os)
            .env("CGO_ENABLED", "0")
            .args(["test".to_string(), b.tags(), b.ldflags()])
            .args(["-c".to_string(), "-o".to_string()])
            .arg(b.output_path(&b.e2e_binary_name(os)))
            .arg("./e2e");
        b.runner().run(&invocation)
    })
}

fn tars(b: &Builder<'_>) -> BuildResult<()> {
    let binary = b.config().binary();
    let output_dir = path_arg(&b.config().output_dir());
    b.for_each_os(|os| {
        let archives = [
            (format!("{}-{}.tar.gz", binary, os), b.binary_name(os)),
            (format!("{}-e2e-{}.tar.gz", binary, os), b.e2e_binary_name(os)),
        ];
        for (archive, file) in archives {
            let invocation = b
                .tool(Tool::Tar)
                .args(["-czf".to_string(), archive, "-C".to_string(), output_dir.clone(), file]);
            b.runner().run(&invocation)?;
        }
        Ok(())
    })
}

fn test_unit(b: &Builder<'_>) -> BuildResult<()> {
    let listing = b.runner().capture(&b.tool(Tool::Go).args(["list", "./..."]))?;
    let sets = partition_packages(&listing);
    debug!(
        unit = sets.unit.len(),
        e2e = sets.e2e.len(),
        "partitioned packages"
    );

    if sets.unit.is_empty() {
        warn!("no unit test packages found, skipping go test");
        return Ok(());
    }
    b.runner().run(&b.tool(Tool::Go).arg("test").args(sets.unit))
}

fn test_e2e(b: &Builder<'_>) -> BuildResult<()> {
    let invocation = b
        .tool(Tool::Go)
        .env("CGO_ENABLED", "0")
        .args(["test".to_string(), b.tags(), b.ldflags()])
        .args(["-v", "./e2e"]);
    b.runner().run(&invocation)
}

fn gradle_test(b: &Builder<'_>) -> BuildResult<()> {
    let config = b.config();
    let dockerfile = path_arg(&config.gradle_dockerfile());
    let image = format!("{}-gradle:{}", config.binary(), b.info().version);

    let archive = b.tool(Tool::Tar).args([
        "-czf".to_string(),
        "-".to_string(),
        dockerfile.clone(),
        b.output_path(&b.binary_name("linux")),
        path_arg(&config.gradle_plugin()),
    ]);
    let build = b.tool(Tool::Docker).args([
        "build".to_string(),
        "-t".to_string(),
        image.clone(),
        "-f".to_string(),
        dockerfile,
        "-".to_string(),
    ]);

    let runner = b.runner();
    let (mut reader, mut writer) = pipe(DEFAULT_CAPACITY);
    thread::scope(|scope| {
        let producer = scope.spawn(move || {
            let produced = runner.run_with_output(&archive, &mut writer);
            writer.close();
            produced
        });

        let consumed = runner.run_with_input(&build, &mut reader);
        // Unblocks the producer if the consumer stopped reading early
        drop(reader);

        let produced = producer
            .join()
            .map_err(|_| BuildError::Pipe("archive producer panicked".to_string()))?;
        pipeline_result(produced, consumed)
    })?;

    runner.run(&b.tool(Tool::Docker).args([
        "run",
        "--rm",
        image.as_str(),
        "bash",
        "-c",
        GRADLE_TEST_SCRIPT,
    ]))
}

/// Combine both ends of a pipeline
///
/// The producer error wins, unless it is only the broken pipe left behind
/// by a consumer that already failed.
fn pipeline_result(produced: BuildResult<()>, consumed: BuildResult<()>) -> BuildResult<()> {
    match (produced, consumed) {
        (Err(BuildError::Io(e)), Err(consumer)) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!(error = %e, "archive producer lost its reader");
            Err(consumer)
        }
        (produced, consumed) => produced.and(consumed),
    }
}

fn schemas(b: &Builder<'_>) -> BuildResult<()> {
    let esc = b.tool(Tool::Esc).arg("--help");
    if let Err(e) = b.runner().capture(&esc) {
        debug!(error = %e, "esc probe failed");
        return Err(BuildError::ToolMissing {
            tool: Tool::Esc.name().to_string(),
            url: Tool::Esc.install_url().to_string(),
        });
    }

    let package = format!("{}/specification", b.config().package());
    b.runner()
        .run(&b.tool(Tool::Go).args(["generate".to_string(), package]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names_round_trip() {
        for target in Target::ALL {
            assert_eq!(target.name().parse::<Target>().unwrap(), target);
        }
    }

    #[test]
    fn test_target_parse_aliases() {
        assert_eq!("TestUnit".parse::<Target>().unwrap(), Target::TestUnit);
        assert_eq!("gradle_test".parse::<Target>().unwrap(), Target::GradleTest);
        assert!("deploy".parse::<Target>().is_err());
    }

    #[test]
    fn test_composition_order() {
        assert_eq!(Target::All.steps(), &[Target::Bin, Target::Test]);
        assert_eq!(Target::Test.steps(), &[Target::TestUnit, Target::TestE2e]);
        assert_eq!(Target::Check.steps(), &[Target::Lint, Target::Test]);
        assert!(!Target::Bin.is_composite());
    }

    #[test]
    fn test_pipeline_result_prefers_root_cause() {
        let broken = || -> BuildResult<()> {
            Err(BuildError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader closed")))
        };
        let docker_failed = || -> BuildResult<()> { Err(BuildError::command_failed("docker build", Some(7))) };
        let tar_failed = || -> BuildResult<()> { Err(BuildError::command_failed("tar", Some(2))) };

        // Broken pipe is only a symptom of the consumer going away
        let err = pipeline_result(broken(), docker_failed()).unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { code: Some(7), .. }));

        let err = pipeline_result(tar_failed(), docker_failed()).unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { code: Some(2), .. }));

        let err = pipeline_result(broken(), Ok(())).unwrap_err();
        assert!(matches!(err, BuildError::Io(_)));

        let err = pipeline_result(Ok(()), docker_failed()).unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { code: Some(7), .. }));
        assert!(pipeline_result(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn test_every_target_described() {
        for target in Target::ALL {
            assert!(!target.description().is_empty());
        }
    }
}
