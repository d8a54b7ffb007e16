//! Build metadata computed once per run
//!
//! The values end up in the application binary through linker flags and
//! name the gradle test image.

use crate::error::BuildResult;
use crate::runner::{CommandRunner, Invocation};
use crate::tools::Tool;
use appforge_config::Config;
use chrono::{Local, SecondsFormat};
use serde::Serialize;
use std::fmt;

/// Experimental mode setting
///
/// Kept as the raw string: anything other than `"off"` turns experimental
/// features on, and the raw value is what gets injected into the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Experimental(String);

impl Experimental {
    /// Create from the raw setting
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Whether experimental features are enabled
    pub fn is_enabled(&self) -> bool {
        self.0 != "off"
    }

    /// Raw setting
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Experimental {
    fn default() -> Self {
        Self::new("off")
    }
}

impl fmt::Display for Experimental {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version metadata shared by every target in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    /// Short git commit hash
    pub commit: String,
    /// Git tag description, used as the version
    pub version: String,
    /// Experimental setting
    pub experimental: Experimental,
    /// RFC 3339 build timestamp
    pub build_time: String,
}

impl BuildInfo {
    /// Create build info from known values
    pub fn new(
        commit: impl Into<String>,
        version: impl Into<String>,
        experimental: Experimental,
        build_time: impl Into<String>,
    ) -> Self {
        Self {
            commit: commit.into(),
            version: version.into(),
            experimental,
            build_time: build_time.into(),
        }
    }

    /// Query git for commit and tag and stamp the current time
    pub fn collect(config: &Config, runner: &dyn CommandRunner) -> BuildResult<Self> {
        let git = config.tool_program(Tool::Git.name());
        let root = config.project_root();

        let commit = runner.capture(
            &Invocation::new(git)
                .args(["rev-parse", "--short", "HEAD"])
                .current_dir(root),
        )?;
        let version = runner.capture(
            &Invocation::new(git)
                .args(["describe", "--tags", "--always", "--dirty"])
                .current_dir(root),
        )?;

        Ok(Self::new(
            commit.trim(),
            version.trim(),
            Experimental::new(config.experimental()),
            timestamp(),
        ))
    }
}

/// Current local time as RFC 3339 with second precision
pub fn timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::DryRunner;

    #[test]
    fn test_experimental_permissive() {
        assert!(!Experimental::new("off").is_enabled());
        assert!(Experimental::new("on").is_enabled());
        assert!(Experimental::new("yes").is_enabled());
        assert!(Experimental::new("").is_enabled());
        assert!(Experimental::new("OFF").is_enabled());
        assert!(!Experimental::default().is_enabled());
    }

    #[test]
    fn test_collect_trims_git_output() {
        let runner = DryRunner::new()
            .with_output("git", "rev-parse", "abc1234\n")
            .with_output("git", "describe", "v0.6.0-12-gabc1234\n");
        let config = Config::defaults("/work/app").with_experimental("on");

        let info = BuildInfo::collect(&config, &runner).unwrap();

        assert_eq!(info.commit, "abc1234");
        assert_eq!(info.version, "v0.6.0-12-gabc1234");
        assert_eq!(info.experimental.as_str(), "on");
        assert!(chrono::DateTime::parse_from_rfc3339(&info.build_time).is_ok());

        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 2);
        assert!(invocations
            .iter()
            .all(|i| i.dir.as_deref() == Some(std::path::Path::new("/work/app"))));
    }

    #[test]
    fn test_collect_propagates_git_failure() {
        let runner = DryRunner::new().fail_on("git", "rev-parse", 128);
        let config = Config::defaults(".");
        assert!(BuildInfo::collect(&config, &runner).is_err());
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let ts = timestamp();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(!ts.contains('.'));
    }
}
