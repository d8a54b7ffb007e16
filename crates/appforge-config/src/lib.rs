//! appforge configuration
//!
//! Loads the `appforge.toml` project file and resolves the settings every
//! build target reads.
//!
//! # Configuration Hierarchy
//!
//! Values are resolved in the following order (later overrides earlier):
//! 1. Built-in defaults (the `docker-app` project layout)
//! 2. Project config (`appforge.toml`, found by walking up from the start directory)
//! 3. Environment variables (`APPFORGE_*`)
//! 4. CLI flags (applied by the caller through [`Config::with_experimental`] and friends)
//!
//! # Example
//!
//! ```no_run
//! use appforge_config::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! println!("building {} for {:?}", config.binary(), config.os_matrix());
//! ```

pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "appforge.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use project::{BuildSection, GradleSection, LintSection, ProjectConfig, ProjectSection};
