#![allow(async_fn_in_trait)]

use std::cell::Cell;
use std::fmt::Display;
use std::ops::Add;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;

use anyhow::Context;
use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

// -----------------------------------------------------------------------------
// Types

/// Where a child process's standard output ends up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Output goes straight to the terminal and the exit code is returned.
    #[default]
    Passthrough,
    /// Standard output is collected and returned as text.
    Capture,
}

/// The value produced by a single invocation of an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Completed { exit_code: i32 },
    Captured { text: String },
}

/// The external program could not be started at all.
#[derive(Debug, Error)]
#[error("failed to launch `{program}`")]
pub struct LaunchError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

/// Holds the output mode of a client.
///
/// The mode sits in a [`Cell`], so a client can flip it through a shared
/// reference but can never be shared between threads.
#[derive(Debug, Default)]
pub struct OutputSettings {
    mode: Cell<OutputMode>,
}

/// Restores the previous output mode when dropped.
#[must_use = "the previous output mode is restored as soon as the guard is dropped"]
pub struct ModeGuard<'a> {
    settings: &'a OutputSettings,
    previous: OutputMode,
}

// -----------------------------------------------------------------------------
// Executor trait

/// Runs an external program with an already tokenized argument vector.
#[cfg_attr(test, automock)]
pub trait Executor {
    async fn run(&self, mode: OutputMode, args: Vec<String>) -> Result<CommandResult>;
}

// -----------------------------------------------------------------------------
// ProcessExecutor

/// Executor that spawns a real child process.
pub struct ProcessExecutor {
    program: String,
    dir: PathBuf,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            dir: dir.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Executor for ProcessExecutor {
    async fn run(&self, mode: OutputMode, args: Vec<String>) -> Result<CommandResult> {
        debug!(program = %self.program, ?mode, ?args, "running command");

        let mut command = Command::new(&self.program);
        command.current_dir(&self.dir).args(&args);
        let launch_error = |source: std::io::Error| LaunchError {
            program: self.program.clone(),
            source,
        };

        match mode {
            OutputMode::Capture => {
                let output = command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::null())
                    .output()
                    .await
                    .map_err(launch_error)?;

                // Don't trim - callers get exactly what the program printed
                Ok(CommandResult::Captured {
                    text: String::from_utf8_lossy(&output.stdout).into_owned(),
                })
            }
            OutputMode::Passthrough => {
                let status = command.status().await.map_err(launch_error)?;
                let exit_code = exit_code(status);
                debug!(program = %self.program, exit_code, "command finished");
                Ok(CommandResult::Completed { exit_code })
            }
        }
    }
}

/// Exit code of a finished child, or the negated signal number if it was killed.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

// -----------------------------------------------------------------------------
// CommandResult impl

impl CommandResult {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Completed { exit_code } => Some(*exit_code),
            Self::Captured { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Completed { .. } => None,
            Self::Captured { text } => Some(text),
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Completed { .. } => None,
            Self::Captured { text } => Some(text),
        }
    }
}

/// Combines the results of consecutive calls.
///
/// Exit codes are summed and captured text is concatenated. A sum can't tell
/// which step failed, only that one did. Mixed pairs keep the right-hand side.
impl Add for CommandResult {
    type Output = CommandResult;

    fn add(self, rhs: CommandResult) -> CommandResult {
        match (self, rhs) {
            (Self::Completed { exit_code: a }, Self::Completed { exit_code: b }) => {
                Self::Completed {
                    exit_code: a.wrapping_add(b),
                }
            }
            (Self::Captured { text: a }, Self::Captured { text: b }) => {
                Self::Captured { text: a + &b }
            }
            (_, rhs) => rhs,
        }
    }
}

impl Display for CommandResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed { exit_code } => write!(f, "{}", exit_code),
            Self::Captured { text } => f.write_str(text),
        }
    }
}

// -----------------------------------------------------------------------------
// OutputSettings impl

impl OutputSettings {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode: Cell::new(mode),
        }
    }

    pub fn get(&self) -> OutputMode {
        self.mode.get()
    }

    pub fn set(&self, mode: OutputMode) {
        self.mode.set(mode);
    }

    /// Switch to `mode` until the returned guard is dropped.
    pub fn scoped(&self, mode: OutputMode) -> ModeGuard<'_> {
        let previous = self.mode.replace(mode);
        ModeGuard {
            settings: self,
            previous,
        }
    }
}

impl Drop for ModeGuard<'_> {
    fn drop(&mut self) {
        self.settings.mode.set(self.previous);
    }
}

// -----------------------------------------------------------------------------
// Argument strings

/// Split an argument string into words using POSIX shell rules.
pub fn tokenize(args: &str) -> Result<Vec<String>> {
    shlex::split(args).with_context(|| format!("Unbalanced quotes in arguments: {}", args))
}

/// Quote a single value so that [`tokenize`] yields it back as one word.
pub fn quote(value: &str) -> Result<String> {
    let quoted = shlex::try_quote(value)
        .with_context(|| format!("Cannot quote argument: {:?}", value))?;
    Ok(quoted.into_owned())
}
