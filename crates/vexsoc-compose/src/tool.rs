//! External tool invocation.
//!
//! Tools are described as [`ToolInvocation`] values and executed through a
//! [`ToolRunner`], so callers can substitute a scripted runner.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use serde::Serialize;

use crate::error::{ComposeError, Result};

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; the current directory when `None`.
    pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: &str) -> Self {
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
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Exit status and captured output of a finished tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external tools. `Err` means the tool could not be started at all.
pub trait ToolRunner: fmt::Debug {
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutput>;
}

/// Spawns real processes and waits for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        let output = cmd.output()?;
        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a tool and turn a spawn failure or non-zero exit into an
/// external-tool error.
pub fn run_checked(runner: &dyn ToolRunner, invocation: &ToolInvocation) -> Result<ToolOutput> {
    tracing::info!(command = %invocation, "running external tool");
    let output = runner.run(invocation).map_err(|e| {
        tracing::warn!(tool = %invocation.program, error = %e, "failed to start tool");
        ComposeError::ExternalTool {
            tool: invocation.program.clone(),
            detail: format!("failed to start: {e}"),
        }
    })?;
    if !output.success() {
        let status = output
            .status
            .map_or_else(|| "killed by signal".to_string(), |c| format!("exit status {c}"));
        tracing::warn!(tool = %invocation.program, %status, "tool failed");
        let stderr = output.stderr.trim();
        return Err(ComposeError::ExternalTool {
            tool: invocation.program.clone(),
            detail: if stderr.is_empty() {
                status
            } else {
                format!("{status}: {stderr}")
            },
        });
    }
    Ok(output)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Records invocations and answers with a fixed exit status.
    #[derive(Debug)]
    pub struct ScriptedRunner {
        pub status: Option<i32>,
        pub stderr: String,
        pub calls: RefCell<Vec<ToolInvocation>>,
    }

    impl ScriptedRunner {
        pub fn exiting(status: i32) -> Self {
            Self {
                status: Some(status),
                stderr: String::new(),
                calls: RefCell::new(Vec::new()),
            }
        }

        pub fn failing(stderr: &str) -> Self {
            Self {
                status: Some(1),
                stderr: stderr.into(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ToolRunner for ScriptedRunner {
        fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutput> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(ToolOutput {
                status: self.status,
                stdout: String::new(),
                stderr: self.stderr.clone(),
            })
        }
    }
}
