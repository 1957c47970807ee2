// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed installation root and home directory,
// a fluent builder for recipe files, and a scripted executor so each
// integration test can provision an isolated environment without touching the
// host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code, clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};

use devenv_cli::cli::{GlobalOpts, InstallOpts};
use devenv_cli::commands::install;
use devenv_cli::config::Settings;
use devenv_cli::engine::RunReport;
use devenv_cli::exec::{ExecResult, Executor};
use devenv_cli::logging::Logger;

/// Executor answering platform probes and scripted package commands.
///
/// `uname -s` reports the configured kernel, `uname -m` reports `x86_64` and
/// `id -u` reports a non-root user. Commands listed with [`succeed`] exit 0;
/// anything else exits 1. Every command line is recorded in call order.
///
/// [`succeed`]: FakeExecutor::succeed
#[derive(Debug)]
pub struct FakeExecutor {
    kernel: String,
    on_path: HashSet<String>,
    succeeding: HashSet<String>,
    outputs: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeExecutor {
    /// A Linux host with the given executables on PATH.
    pub fn linux(on_path: &[&str]) -> Self {
        Self {
            kernel: "Linux".to_string(),
            on_path: on_path.iter().map(ToString::to_string).collect(),
            succeeding: HashSet::new(),
            outputs: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Report a different kernel name from `uname -s`.
    pub fn kernel(mut self, name: &str) -> Self {
        self.kernel = name.to_string();
        self
    }

    /// Let `command` (full command line) exit 0.
    pub fn succeed(mut self, command: &str) -> Self {
        self.succeeding.insert(command.to_string());
        self
    }

    /// Command lines run so far, excluding platform probes.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Recorded command lines that install something.
    pub fn install_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(" install ") || c.starts_with("sh -c"))
            .collect()
    }

    fn respond(&self, program: &str, args: &[&str]) -> ExecResult {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        let probe = match line.as_str() {
            "uname -s" => Some(self.kernel.clone()),
            "uname -m" => Some("x86_64".to_string()),
            "id -u" => Some("1000".to_string()),
            _ => None,
        };
        if let Some(stdout) = probe {
            return ExecResult {
                stdout: format!("{stdout}\n"),
                stderr: String::new(),
                success: true,
                code: Some(0),
            };
        }

        self.calls.lock().expect("calls lock").push(line.clone());
        let success = self.succeeding.contains(&line);
        ExecResult {
            stdout: self.outputs.get(&line).cloned().unwrap_or_default(),
            stderr: if success {
                String::new()
            } else {
                format!("{program}: not available in test")
            },
            success,
            code: Some(i32::from(!success)),
        }
    }
}

impl Executor for FakeExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.respond(program, args);
        if !result.success {
            bail!("{program} failed (exit 1): {}", result.stderr);
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
        self.on_path.contains(program)
    }
}

/// An isolated root, home and backup directory backed by a [`tempfile::TempDir`].
pub struct TestEnv {
    /// Temporary directory holding `root/`, `home/` and `backups/`.
    pub dir: tempfile::TempDir,
}

impl TestEnv {
    /// Create an environment with an empty `root/conf/` and `home/`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("root").join("conf")).expect("create conf dir");
        std::fs::create_dir_all(dir.path().join("home")).expect("create home dir");
        Self { dir }
    }

    /// Installation root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    /// Home directory.
    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// Directory receiving per-run backup folders.
    pub fn backups(&self) -> PathBuf {
        self.dir.path().join("backups")
    }

    /// Settings pointing at this environment.
    pub fn settings(&self) -> Settings {
        Settings {
            root: self.root(),
            home: self.home(),
            config_home: self.home().join(".config"),
            backup_root: self.backups(),
        }
    }

    /// Number of backup files taken across all runs (manifests excluded).
    pub fn backup_count(&self) -> usize {
        let Ok(runs) = std::fs::read_dir(self.backups()) else {
            return 0;
        };
        runs.filter_map(Result::ok)
            .filter_map(|run| std::fs::read_dir(run.path()).ok())
            .flatten()
            .filter_map(Result::ok)
            .filter(|e| e.file_name() != "manifest.json")
            .count()
    }

    /// Run `install` against this environment.
    pub fn install(&self, executor: &Arc<FakeExecutor>, opts: Options) -> (Result<RunReport>, Arc<Logger>) {
        let global = GlobalOpts {
            dry_run: opts.dry_run,
            root: Some(self.root()),
            parallel: true,
        };
        let install_opts = InstallOpts {
            force: opts.force,
            filter: opts.filter.map(String::from),
        };
        let log = Arc::new(Logger::with_log_file(None));
        let report = install::execute(
            self.settings(),
            &global,
            &install_opts,
            log.clone(),
            executor.clone(),
        );
        (report, log)
    }
}

/// Install options for [`TestEnv::install`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub dry_run: bool,
    pub force: bool,
    pub filter: Option<&'static str>,
}

/// Fluent builder for [`TestEnv`].
pub struct TestEnvBuilder {
    env: TestEnv,
}

impl TestEnvBuilder {
    /// Begin building a new environment.
    pub fn new() -> Self {
        Self { env: TestEnv::new() }
    }

    /// Write `content` to `conf/recipes.toml`.
    pub fn recipes(self, content: &str) -> Self {
        self.config_file("recipes.toml", content)
    }

    /// Write `content` to `conf/<filename>`.
    pub fn config_file(self, filename: &str, content: &str) -> Self {
        let path = self.env.root().join("conf").join(filename);
        std::fs::write(path, content).expect("write config file");
        self
    }

    /// Create a file under the root so that recipe sources exist.
    pub fn source(self, rel: &str, content: &str) -> Self {
        let path = self.env.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create source parent");
        }
        std::fs::write(&path, content).expect("write source file");
        self
    }

    /// Create a file in the home directory before the run.
    pub fn home_file(self, rel: &str, content: &str) -> Self {
        let path = self.env.home().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create home parent");
        }
        std::fs::write(&path, content).expect("write home file");
        self
    }

    /// Finish building and return the environment.
    pub fn build(self) -> TestEnv {
        self.env
    }
}
