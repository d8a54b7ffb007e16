//! Project Configuration (appforge.toml)
//!
//! Every section and every field is optional; anything left out falls back
//! to the defaults in [`crate::loader::Config`].

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Tools whose program name may be overridden in the `[tools]` table
pub const KNOWN_TOOLS: &[&str] = &["go", "tar", "docker", "gometalinter", "dep", "git", "esc"];

/// Project configuration from appforge.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Application identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSection>,

    /// Cross-compilation and flag settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSection>,

    /// Linter settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintSection>,

    /// Gradle plugin end-to-end test settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradle: Option<GradleSection>,

    /// Program name overrides, keyed by tool
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tools: BTreeMap<String, String>,
}

/// Application identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Binary name (default: "docker-app")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,

    /// Go import path (default: "github.com/docker/app")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

/// Build settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Target operating systems
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<Vec<String>>,

    /// Binary output directory (default: "bin")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Experimental mode ("on" or "off")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<String>,
}

/// Linter settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LintSection {
    /// Linter configuration file (default: "gometalinter.json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PathBuf>,
}

/// Gradle plugin test settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GradleSection {
    /// Dockerfile used for the gradle image (default: "Dockerfile.gradle")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<PathBuf>,

    /// Gradle plugin sources (default: "integrations/gradle")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(project) = &self.project {
            if let Some(binary) = &project.binary {
                validate_word("project.binary", binary)?;
            }
            if let Some(package) = &project.package {
                validate_word("project.package", package)?;
            }
        }

        if let Some(os) = self.build.as_ref().and_then(|b| b.os.as_ref()) {
            validate_os_list("build.os", os)?;
        }

        for (tool, program) in &self.tools {
            if !KNOWN_TOOLS.contains(&tool.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("tools.{}", tool),
                    reason: format!("unknown tool, expected one of: {}", KNOWN_TOOLS.join(", ")),
                });
            }
            validate_word(&format!("tools.{}", tool), program)?;
        }

        Ok(())
    }
}

/// Validate an OS matrix: at least one entry, no blank or whitespace-bearing names
pub(crate) fn validate_os_list(field: &str, os: &[String]) -> ConfigResult<()> {
    if os.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "at least one operating system is required".to_string(),
        });
    }
    for name in os {
        validate_word(field, name)?;
    }
    Ok(())
}

fn validate_word(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "value cannot be empty".to_string(),
        });
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}' must not contain whitespace", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config: ProjectConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[project]
binary = "docker-app"
package = "github.com/docker/app"

[build]
os = ["linux", "darwin"]
output = "dist"
experimental = "on"

[lint]
config = "lint.json"

[gradle]
dockerfile = "Dockerfile.gradle"
plugin = "integrations/gradle"

[tools]
go = "go1.11"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        let build = config.build.as_ref().unwrap();
        assert_eq!(build.os.as_deref(), Some(&["linux".to_string(), "darwin".to_string()][..]));
        assert_eq!(build.experimental.as_deref(), Some("on"));
        assert_eq!(config.tools.get("go").map(String::as_str), Some("go1.11"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[project]
name = "oops"
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[test]
    fn test_empty_os_list_rejected() {
        let config = ProjectConfig {
            build: Some(BuildSection {
                os: Some(Vec::new()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_os_entry_rejected() {
        assert!(validate_os_list("build.os", &["linux".to_string(), " ".to_string()]).is_err());
        assert!(validate_os_list("build.os", &["linux".to_string()]).is_ok());
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let mut config = ProjectConfig::default();
        config.tools.insert("make".to_string(), "gmake".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tools.make"));
    }

    #[test]
    fn test_binary_with_whitespace_rejected() {
        let config = ProjectConfig {
            project: Some(ProjectSection {
                binary: Some("docker app".to_string()),
                package: None,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
