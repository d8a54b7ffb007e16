//! CLI configuration via environment variables
//!
//! Project settings live in `appforge.toml` and are resolved by
//! `appforge-config`; this only covers how the CLI itself reports.

use std::env;

/// Filter used when neither a flag nor the environment picks one
pub const DEFAULT_LOG_FILTER: &str = "info";

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Log filter directive (APPFORGE_LOG, falling back to RUST_LOG)
    pub log_filter: Option<String>,
    /// Disable colored output (APPFORGE_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Default to JSON output where supported (APPFORGE_JSON=1)
    pub default_json: bool,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            log_filter: env::var("APPFORGE_LOG")
                .or_else(|_| env::var("RUST_LOG"))
                .ok()
                .filter(|v| !v.trim().is_empty()),
            no_color: env::var_os("APPFORGE_NO_COLOR").is_some() || env::var_os("NO_COLOR").is_some(),
            default_json: env::var("APPFORGE_JSON")
                .map(|v| {
                    let lower = v.to_lowercase();
                    !(lower.is_empty() || lower == "0" || lower == "false" || lower == "off")
                })
                .unwrap_or(false),
        }
    }

    /// Filter directive for the log subscriber
    ///
    /// `-v` and `-q` win over the environment.
    pub fn log_filter(&self, verbosity: Verbosity) -> &str {
        match verbosity {
            Verbosity::Verbose => "debug",
            Verbosity::Quiet => "warn",
            Verbosity::Normal => self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER),
        }
    }
}

/// How chatty the CLI is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "APPFORGE_LOG",
            "RUST_LOG",
            "APPFORGE_NO_COLOR",
            "NO_COLOR",
            "APPFORGE_JSON",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();
        let config = EnvConfig::from_env();
        assert!(config.log_filter.is_none());
        assert!(!config.no_color);
        assert!(!config.default_json);
        assert_eq!(config.log_filter(Verbosity::Normal), "info");
    }

    #[test]
    #[serial]
    fn test_appforge_log_wins_over_rust_log() {
        clear_env();
        env::set_var("RUST_LOG", "trace");
        assert_eq!(EnvConfig::from_env().log_filter.as_deref(), Some("trace"));

        env::set_var("APPFORGE_LOG", "appforge_build=debug");
        assert_eq!(
            EnvConfig::from_env().log_filter.as_deref(),
            Some("appforge_build=debug")
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_flags_override_env_filter() {
        clear_env();
        env::set_var("APPFORGE_LOG", "trace");
        let config = EnvConfig::from_env();
        assert_eq!(config.log_filter(Verbosity::Verbose), "debug");
        assert_eq!(config.log_filter(Verbosity::Quiet), "warn");
        assert_eq!(config.log_filter(Verbosity::Normal), "trace");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_no_color() {
        clear_env();
        env::set_var("NO_COLOR", "1");
        assert!(EnvConfig::from_env().no_color);
        clear_env();

        env::set_var("APPFORGE_NO_COLOR", "1");
        assert!(EnvConfig::from_env().no_color);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_json() {
        clear_env();
        env::set_var("APPFORGE_JSON", "1");
        assert!(EnvConfig::from_env().default_json);
        env::set_var("APPFORGE_JSON", "false");
        assert!(!EnvConfig::from_env().default_json);
        clear_env();
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
    }
}
