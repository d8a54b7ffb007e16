//! External tool execution
//!
//! Every target reaches the outside world through [`CommandRunner`]. The
//! [`SystemRunner`] spawns real processes; the [`DryRunner`] only records
//! what would have run and answers with scripted output, which is what
//! `--dry-run` and the test suite use.

use crate::error::{BuildError, BuildResult};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, info};

/// A single external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute
    pub program: String,
    /// Arguments, passed verbatim
    pub args: Vec<String>,
    /// Extra environment variables, in insertion order
    pub env: Vec<(String, String)>,
    /// Working directory (inherited when unset)
    pub dir: Option<PathBuf>,
}

impl Invocation {
    /// Create new invocation of `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            dir: None,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for this invocation only
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Look up an environment variable set on this invocation
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, value)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Capability to run external tools and touch the filesystem
///
/// Implementations must be shareable across threads: the gradle pipeline
/// runs its archive producer on a second thread.
pub trait CommandRunner: Send + Sync {
    /// Run with inherited stdio; a non-zero exit is an error
    fn run(&self, invocation: &Invocation) -> BuildResult<()>;

    /// Run and return captured stdout
    fn capture(&self, invocation: &Invocation) -> BuildResult<String>;

    /// Run with stdin fed from `input` until it reaches end-of-stream
    fn run_with_input(&self, invocation: &Invocation, input: &mut dyn Read) -> BuildResult<()>;

    /// Run with stdout streamed into `output`
    fn run_with_output(&self, invocation: &Invocation, output: &mut dyn Write) -> BuildResult<()>;

    /// Remove a file or directory tree. Missing paths are not an error.
    fn remove(&self, path: &Path) -> BuildResult<()>;
}

/// Runner that spawns real processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create new system runner
    pub fn new() -> Self {
        Self
    }
}

fn check_status(invocation: &Invocation, status: std::process::ExitStatus) -> BuildResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(BuildError::command_failed(invocation, status.code()))
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> BuildResult<()> {
        debug!(command = %invocation, "run");
        let status = invocation
            .command()
            .stdin(Stdio::inherit())
            .status()
            .map_err(|e| BuildError::spawn(&invocation.program, e))?;
        check_status(invocation, status)
    }

    fn capture(&self, invocation: &Invocation) -> BuildResult<String> {
        debug!(command = %invocation, "capture");
        let output = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| BuildError::spawn(&invocation.program, e))?;
        check_status(invocation, output.status)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_with_input(&self, invocation: &Invocation, input: &mut dyn Read) -> BuildResult<()> {
        debug!(command = %invocation, "run with piped stdin");
        let mut child = invocation
            .command()
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::spawn(&invocation.program, e))?;

        let copied = match child.stdin.take() {
            Some(mut stdin) => io::copy(input, &mut stdin).map(|_| ()),
            None => Ok(()),
        };
        // stdin is closed here, so the child sees end-of-stream before we wait
        let status = child.wait()?;
        check_status(invocation, status)?;
        copied.map_err(BuildError::from)
    }

    fn run_with_output(&self, invocation: &Invocation, output: &mut dyn Write) -> BuildResult<()> {
        debug!(command = %invocation, "run with piped stdout");
        let mut child = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::spawn(&invocation.program, e))?;

        let copied = match child.stdout.take() {
            Some(mut stdout) => io::copy(&mut stdout, output).and_then(|_| output.flush()),
            None => Ok(()),
        };
        if let Err(e) = copied {
            // Reader went away; don't leave the child blocked on a full pipe
            let _ = child.kill();
            let _ = child.wait();
            return Err(BuildError::Io(e));
        }
        let status = child.wait()?;
        check_status(invocation, status)
    }

    fn remove(&self, path: &Path) -> BuildResult<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(BuildError::io(path, e)),
        };
        debug!(path = %path.display(), "remove");
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        removed.map_err(|e| BuildError::io(path, e))
    }
}

/// What a [`DryRunner`] saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// A program invocation, with whatever was fed to its stdin
    Command {
        invocation: Invocation,
        stdin: Option<Vec<u8>>,
    },
    /// A filesystem removal
    Remove(PathBuf),
}

impl Recorded {
    /// The invocation, if this record is one
    pub fn invocation(&self) -> Option<&Invocation> {
        match self {
            Self::Command { invocation, .. } => Some(invocation),
            Self::Remove(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    outputs: HashMap<String, String>,
    failures: HashMap<String, i32>,
}

/// Runner that records invocations instead of executing them
///
/// Responses are keyed by program and first argument (`"go list"`,
/// `"git rev-parse"`); anything unscripted succeeds with empty output.
#[derive(Debug, Default)]
pub struct DryRunner {
    script: Script,
    records: Mutex<Vec<Recorded>>,
    announce: bool,
}

impl DryRunner {
    /// Create new dry runner
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every recorded action at info level
    pub fn announcing(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }

    /// Answer `program first_arg` with `output`
    pub fn with_output(mut self, program: &str, first_arg: &str, output: impl Into<String>) -> Self {
        self.script
            .outputs
            .insert(script_key(program, first_arg), output.into());
        self
    }

    /// Make `program first_arg` exit with `code`
    pub fn fail_on(mut self, program: &str, first_arg: &str, code: i32) -> Self {
        self.script
            .failures
            .insert(script_key(program, first_arg), code);
        self
    }

    /// Everything recorded so far, in order
    pub fn records(&self) -> Vec<Recorded> {
        self.lock().clone()
    }

    /// Recorded invocations only, in order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock()
            .iter()
            .filter_map(|r| r.invocation().cloned())
            .collect()
    }

    /// Recorded invocations rendered as command lines
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations().iter().map(ToString::to_string).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Recorded>> {
        // A panicking test thread must not hide what was recorded before it
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, invocation: &Invocation, stdin: Option<Vec<u8>>) -> BuildResult<Option<&String>> {
        if self.announce {
            info!("[dry-run] {}", invocation);
        }
        self.lock().push(Recorded::Command {
            invocation: invocation.clone(),
            stdin,
        });

        let key = script_key(&invocation.program, invocation.args.first().map_or("", String::as_str));
        if let Some(code) = self.script.failures.get(&key) {
            return Err(BuildError::command_failed(invocation, Some(*code)));
        }
        Ok(self.script.outputs.get(&key))
    }
}

fn script_key(program: &str, first_arg: &str) -> String {
    format!("{} {}", program, first_arg)
}

impl CommandRunner for DryRunner {
    fn run(&self, invocation: &Invocation) -> BuildResult<()> {
        self.record(invocation, None).map(|_| ())
    }

    fn capture(&self, invocation: &Invocation) -> BuildResult<String> {
        Ok(self.record(invocation, None)?.cloned().unwrap_or_default())
    }

    fn run_with_input(&self, invocation: &Invocation, input: &mut dyn Read) -> BuildResult<()> {
        let mut stdin = Vec::new();
        input.read_to_end(&mut stdin)?;
        self.record(invocation, Some(stdin)).map(|_| ())
    }

    fn run_with_output(&self, invocation: &Invocation, output: &mut dyn Write) -> BuildResult<()> {
        if let Some(text) = self.record(invocation, None)? {
            output.write_all(text.as_bytes())?;
        }
        output.flush()?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> BuildResult<()> {
        if self.announce {
            info!("[dry-run] remove {}", path.display());
        }
        self.lock().push(Recorded::Remove(path.to_path_buf()));
        Ok(())
    }
}
