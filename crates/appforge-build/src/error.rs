/// Build error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Command `{command}` failed ({})", exit_description(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Failed to start '{program}': {error}")]
    Spawn {
        program: String,
        error: std::io::Error,
    },

    #[error("Tool '{tool}' is not available, install it from {url}")]
    ToolMissing { tool: String, url: String },

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Pipe error: {0}")]
    Pipe(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] appforge_config::ConfigError),

    #[error("I/O error at {path}: {error}")]
    IoAt {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Create a command failure from the rendered command line and its exit code
    pub fn command_failed(command: impl ToString, code: Option<i32>) -> Self {
        Self::CommandFailed {
            command: command.to_string(),
            code,
        }
    }

    /// Create a spawn error
    pub fn spawn(program: impl Into<String>, error: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            error,
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            error,
        }
    }

    /// Exit code the CLI should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = BuildError::command_failed("go test ./...", Some(2));
        assert_eq!(err.to_string(), "Command `go test ./...` failed (exit code 2)");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_command_killed_display() {
        let err = BuildError::command_failed("docker build -", None);
        assert!(err.to_string().contains("terminated by signal"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_other_errors_exit_one() {
        assert_eq!(BuildError::UnknownTarget("nope".into()).exit_code(), 1);
    }
}
