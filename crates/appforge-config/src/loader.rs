//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::project::{validate_os_list, ProjectConfig};
use crate::{ConfigResult, CONFIG_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Default binary name
pub const DEFAULT_BINARY: &str = "docker-app";
/// Default Go import path
pub const DEFAULT_PACKAGE: &str = "github.com/docker/app";
/// Default operating system matrix
pub const DEFAULT_OS: &[&str] = &["linux", "darwin", "windows"];
/// Experimental setting when nothing overrides it
pub const DEFAULT_EXPERIMENTAL: &str = "off";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Project config (appforge.toml) - overrides built-in defaults
/// 2. Environment variables (APPFORGE_*) - overrides project
/// 3. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader;

/// Resolved configuration
///
/// Built once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration after environment overrides
    pub project: ProjectConfig,

    /// Directory every tool runs in (where appforge.toml was found, or the start directory)
    pub project_root: PathBuf,

    /// Whether an appforge.toml was found
    pub found: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find appforge.toml. When none exists
    /// the defaults apply and the start directory becomes the project root.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = match self.find_project_config(start_dir)? {
            Some((root, config)) => (Some(root), config),
            None => (None, ProjectConfig::default()),
        };

        let project = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project,
            found: project_root.is_some(),
            project_root: project_root.unwrap_or_else(|| start_dir.to_path_buf()),
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(&self, start_dir: &Path) -> ConfigResult<Option<(PathBuf, ProjectConfig)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok(Some((current, project_config)));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok(None),
            }
        }
    }

    /// Apply environment variable overrides to project config
    ///
    /// - `APPFORGE_EXPERIMENTAL=on`
    /// - `APPFORGE_OS=linux,darwin`
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(experimental) = env::var("APPFORGE_EXPERIMENTAL") {
            config.build.get_or_insert_with(Default::default).experimental = Some(experimental);
        }

        if let Ok(os) = env::var("APPFORGE_OS") {
            let os = split_os_list(&os);
            validate_os_list("APPFORGE_OS", &os)?;
            config.build.get_or_insert_with(Default::default).os = Some(os);
        }

        Ok(config)
    }
}

/// Split a comma separated OS list, dropping blank entries
pub fn split_os_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Configuration rooted at `project_root` with every default in place
    pub fn defaults(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project: ProjectConfig::default(),
            project_root: project_root.into(),
            found: false,
        }
    }

    /// Override the experimental setting (CLI flag)
    pub fn with_experimental(mut self, experimental: impl Into<String>) -> Self {
        self.project.build.get_or_insert_with(Default::default).experimental =
            Some(experimental.into());
        self
    }

    /// Override the OS matrix (CLI flag)
    pub fn with_os(mut self, os: Vec<String>) -> ConfigResult<Self> {
        validate_os_list("--os", &os)?;
        self.project.build.get_or_insert_with(Default::default).os = Some(os);
        Ok(self)
    }

    /// Get the project root directory
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Binary name, e.g. `docker-app`
    pub fn binary(&self) -> &str {
        self.project
            .project
            .as_ref()
            .and_then(|p| p.binary.as_deref())
            .unwrap_or(DEFAULT_BINARY)
    }

    /// Go import path, e.g. `github.com/docker/app`
    pub fn package(&self) -> &str {
        self.project
            .project
            .as_ref()
            .and_then(|p| p.package.as_deref())
            .unwrap_or(DEFAULT_PACKAGE)
    }

    /// Operating systems to cross-compile for, in declared order
    pub fn os_matrix(&self) -> Vec<String> {
        match self.project.build.as_ref().and_then(|b| b.os.as_ref()) {
            Some(os) => os.clone(),
            None => DEFAULT_OS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Binary output directory, relative to the project root
    pub fn output_dir(&self) -> PathBuf {
        self.project
            .build
            .as_ref()
            .and_then(|b| b.output.clone())
            .unwrap_or_else(|| PathBuf::from("bin"))
    }

    /// Raw experimental setting. Passed through untouched to the linker flags.
    pub fn experimental(&self) -> &str {
        self.project
            .build
            .as_ref()
            .and_then(|b| b.experimental.as_deref())
            .unwrap_or(DEFAULT_EXPERIMENTAL)
    }

    /// Linter configuration file
    pub fn lint_config(&self) -> PathBuf {
        self.project
            .lint
            .as_ref()
            .and_then(|l| l.config.clone())
            .unwrap_or_else(|| PathBuf::from("gometalinter.json"))
    }

    /// Dockerfile for the gradle plugin image
    pub fn gradle_dockerfile(&self) -> PathBuf {
        self.project
            .gradle
            .as_ref()
            .and_then(|g| g.dockerfile.clone())
            .unwrap_or_else(|| PathBuf::from("Dockerfile.gradle"))
    }

    /// Gradle plugin sources shipped into the image
    pub fn gradle_plugin(&self) -> PathBuf {
        self.project
            .gradle
            .as_ref()
            .and_then(|g| g.plugin.clone())
            .unwrap_or_else(|| PathBuf::from("integrations/gradle"))
    }

    /// Program to execute for `tool`, honoring `[tools]` overrides
    pub fn tool_program<'a>(&'a self, tool: &'a str) -> &'a str {
        self.project
            .tools
            .get(tool)
            .map(String::as_str)
            .unwrap_or(tool)
    }

    /// Check if this is a project (has appforge.toml)
    pub fn is_project(&self) -> bool {
        self.found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    #[serial]
    fn test_defaults_without_file() {
        env::remove_var("APPFORGE_EXPERIMENTAL");
        env::remove_var("APPFORGE_OS");
        let temp_dir = TempDir::new().unwrap();

        let config = ConfigLoader::new().load_from_directory(temp_dir.path()).unwrap();

        assert!(!config.is_project());
        assert_eq!(config.project_root(), temp_dir.path());
        assert_eq!(config.binary(), "docker-app");
        assert_eq!(config.package(), "github.com/docker/app");
        assert_eq!(config.os_matrix(), vec!["linux", "darwin", "windows"]);
        assert_eq!(config.experimental(), "off");
        assert_eq!(config.output_dir(), PathBuf::from("bin"));
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        env::remove_var("APPFORGE_OS");
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[project]
binary = "parent-app"
"#,
        );
        let sub_dir = temp_dir.path().join("cmd").join("parent-app");
        fs::create_dir_all(&sub_dir).unwrap();

        let config = ConfigLoader::new().load_from_directory(&sub_dir).unwrap();

        assert!(config.is_project());
        assert_eq!(config.binary(), "parent-app");
        assert_eq!(config.project_root(), temp_dir.path());
    }

    #[test]
    #[serial]
    fn test_env_override_experimental() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[build]
experimental = "off"
"#,
        );

        env::set_var("APPFORGE_EXPERIMENTAL", "on");
        let config = ConfigLoader::new().load_from_directory(temp_dir.path()).unwrap();
        env::remove_var("APPFORGE_EXPERIMENTAL");

        assert_eq!(config.experimental(), "on");
    }

    #[test]
    #[serial]
    fn test_env_override_os() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("APPFORGE_OS", "linux, windows,");
        let config = ConfigLoader::new().load_from_directory(temp_dir.path()).unwrap();
        env::remove_var("APPFORGE_OS");

        assert_eq!(config.os_matrix(), vec!["linux", "windows"]);
    }

    #[test]
    #[serial]
    fn test_env_override_os_empty_rejected() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("APPFORGE_OS", " , ");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("APPFORGE_OS");

        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = Config::defaults("/tmp/project")
            .with_experimental("yes")
            .with_os(vec!["darwin".to_string()])
            .unwrap();

        assert_eq!(config.experimental(), "yes");
        assert_eq!(config.os_matrix(), vec!["darwin"]);
    }

    #[test]
    fn test_tool_program_override() {
        let mut config = Config::defaults(".");
        config
            .project
            .tools
            .insert("docker".to_string(), "podman".to_string());

        assert_eq!(config.tool_program("docker"), "podman");
        assert_eq!(config.tool_program("go"), "go");
    }

    #[test]
    fn test_split_os_list() {
        assert_eq!(split_os_list("linux,darwin"), vec!["linux", "darwin"]);
        assert_eq!(split_os_list(" linux ,, "), vec!["linux"]);
        assert!(split_os_list("").is_empty());
    }
}
