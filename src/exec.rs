//! External command execution.
//!
//! Every package-manager call, version-control call, and recipe command goes
//! through the [`Executor`] trait so that exit statuses are always checked in
//! one place and tests can substitute a scripted implementation.
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not terminated by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// The most useful diagnostic text from a failed command.
    ///
    /// Several package managers write their errors to stdout, so stderr is
    /// preferred only when it is non-empty.
    #[must_use]
    pub fn detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over running external programs.
pub trait Executor: Send + Sync {
    /// Run a command and return its output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command in a specific directory. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command, allowing failure (returns the result without bailing).
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Check if a program is available on PATH.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.detail()
        );
    }
    Ok(result)
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        execute_checked(cmd, program)
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir);
        execute_checked(cmd, &format!("{program} in {}", dir.display()))
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Scripted [`Executor`] for unit tests.
///
/// Responses are keyed by the full command line (`program arg1 arg2`). Any
/// command without a scripted response fails with exit code 127 and
/// `unexpected call` on stderr. Every call is recorded in order.
#[cfg(test)]
pub(crate) mod test_helpers {
    use super::{ExecResult, Executor};
    use anyhow::{Result, bail};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub(crate) struct ScriptedExecutor {
        responses: HashMap<String, ExecResult>,
        on_path: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Programs reported as present by [`Executor::which`].
        pub(crate) fn on_path(mut self, programs: &[&str]) -> Self {
            self.on_path
                .extend(programs.iter().map(ToString::to_string));
            self
        }

        /// Script a successful response for `command`.
        pub(crate) fn succeed(mut self, command: &str, stdout: &str) -> Self {
            self.responses.insert(
                command.to_string(),
                ExecResult {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    success: true,
                    code: Some(0),
                },
            );
            self
        }

        /// Script a failing response (exit 1) for `command`.
        pub(crate) fn fail(mut self, command: &str, stderr: &str) -> Self {
            self.responses.insert(
                command.to_string(),
                ExecResult {
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                    success: false,
                    code: Some(1),
                },
            );
            self
        }

        /// Command lines run so far, in call order.
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().map_or_else(|_| vec![], |g| g.clone())
        }

        fn respond(&self, program: &str, args: &[&str]) -> ExecResult {
            let line = std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(line.clone());
            }
            self.responses.get(&line).cloned().unwrap_or(ExecResult {
                stdout: String::new(),
                stderr: "unexpected call".to_string(),
                success: false,
                code: Some(127),
            })
        }
    }

    impl Executor for ScriptedExecutor {
        fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
            let result = self.respond(program, args);
            if !result.success {
                bail!(
                    "{program} failed (exit {}): {}",
                    result.code.unwrap_or(-1),
                    result.detail()
                );
            }
            Ok(result)
        }

        fn run_in(&self, _dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
            self.run(program, args)
        }

        fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
            Ok(self.respond(program, args))
        }

        fn which(&self, program: &str) -> bool {
            self.on_path.iter().any(|p| p == program)
        }
    }
}
