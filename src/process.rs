//! Typed process launching.
//!
//! Every system mutation in isislab goes through this module: a
//! [`ProcessSpec`] names an executable and its argument list, and is either
//! run to completion with captured output or spawned into a
//! [`ProcessHandle`] with explicit wait/kill operations. Launch failures and
//! non-zero exits surface as checked errors instead of unobserved shell
//! output.

use std::fmt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Output, Stdio};

/// Errors raised while launching or supervising an external process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to kill '{program}': {source}")]
    Kill {
        program: String,
        source: std::io::Error,
    },
}

/// Declarative description of a process launch: executable, arguments and
/// an optional working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// The command line as a single string, for logging and assertions.
    pub fn rendered(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd
    }

    /// Run to completion, capturing output. A non-zero exit status is an
    /// error carrying the captured stderr.
    pub fn run(&self) -> Result<CommandOutput, ProcessError> {
        let output = self.output()?;
        if !output.status.success() {
            return Err(ProcessError::Failed {
                command: self.rendered(),
                status: output.status,
                stderr: output.stderr.trim_end().to_string(),
            });
        }
        Ok(output)
    }

    /// Run to completion, capturing output regardless of exit status. Only
    /// a failure to launch at all is an error. Used on teardown paths where
    /// absent targets are expected.
    pub fn output(&self) -> Result<CommandOutput, ProcessError> {
        log::debug!("exec: {}", self.rendered());
        let output = self
            .command()
            .output()
            .map_err(|source| ProcessError::Launch {
                program: self.program.clone(),
                source,
            })?;
        Ok(CommandOutput::from(output))
    }

    /// Spawn without waiting, returning a handle with explicit
    /// wait/kill/status operations.
    pub fn spawn(&self) -> Result<ProcessHandle, ProcessError> {
        log::debug!("spawn: {}", self.rendered());
        let child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Launch {
                program: self.program.clone(),
                source,
            })?;
        Ok(ProcessHandle {
            program: self.program.clone(),
            child,
        })
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rendered())
    }
}

/// Captured result of a completed process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// A spawned process with explicit lifecycle operations.
#[derive(Debug)]
pub struct ProcessHandle {
    program: String,
    child: Child,
}

impl ProcessHandle {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn wait(&mut self) -> Result<ExitStatus, ProcessError> {
        self.child.wait().map_err(|source| ProcessError::Wait {
            program: self.program.clone(),
            source,
        })
    }

    /// Non-blocking status check; `None` while still running.
    pub fn try_status(&mut self) -> Result<Option<ExitStatus>, ProcessError> {
        self.child.try_wait().map_err(|source| ProcessError::Wait {
            program: self.program.clone(),
            source,
        })
    }

    pub fn kill(&mut self) -> Result<(), ProcessError> {
        self.child.kill().map_err(|source| ProcessError::Kill {
            program: self.program.clone(),
            source,
        })
    }
}
