//! Recipes described in `recipes.toml`.
//!
//! A declarative recipe runs in fixed stages: packages (sequential), then
//! three filesystem phases (directories; files, symlinks and trees; lines),
//! then commands (sequential). Steps inside one filesystem phase run on the
//! Rayon pool when parallelism is enabled and no destination equals or
//! contains another; the phase is joined and every failure aggregated before
//! the next stage.
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::Settings;
use crate::config::recipes::{PackageSpec, RecipeSpec};
use crate::error::{ConfigError, GuardError, ProvisionError};
use crate::guard::{Mutation, MutationGuard};
use crate::installer::{InstallResult, PackageRequest};
use crate::platform::PlatformInfo;

use super::{Context, Recipe};

/// Content for a managed file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileContent {
    Inline(String),
    Source(PathBuf),
}

/// One filesystem step with fully expanded paths.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FsStep {
    Directory(PathBuf),
    File { target: PathBuf, content: FileContent },
    Line { file: PathBuf, line: String },
    Symlink { source: PathBuf, target: PathBuf },
    Tree { source: PathBuf, target: PathBuf },
}

impl FsStep {
    fn destination(&self) -> &Path {
        match self {
            Self::Directory(path) => path,
            Self::Line { file, .. } => file,
            Self::File { target, .. } | Self::Symlink { target, .. } | Self::Tree { target, .. } => {
                target
            }
        }
    }

    fn apply(&self, guard: &MutationGuard) -> Result<Mutation, ProvisionError> {
        let mutation = match self {
            Self::Directory(path) => guard.ensure_directory(path)?,
            Self::File { target, content } => {
                let bytes = match content {
                    FileContent::Inline(text) => text.clone().into_bytes(),
                    FileContent::Source(source) => {
                        std::fs::read(source).map_err(|e| GuardError::MutationFailed {
                            action: "write".to_string(),
                            path: target.clone(),
                            reason: format!("reading {}: {e}", source.display()),
                            backup: None,
                        })?
                    }
                };
                guard.ensure_file(bytes, target)?
            }
            Self::Line { file, line } => guard.ensure_line(line, file)?,
            Self::Symlink { source, target } => guard.ensure_symlink(source, target)?,
            Self::Tree { source, target } => guard.copy_tree(source, target)?,
        };
        Ok(mutation)
    }
}

/// A shell command with an optional idempotence guard.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandStep {
    run: String,
    dir: Option<PathBuf>,
    creates: Option<PathBuf>,
}

impl CommandStep {
    /// Run the command; returns whether anything was (or would be) done.
    fn execute(&self, ctx: &Context) -> Result<bool> {
        if let Some(creates) = &self.creates
            && creates.exists()
        {
            ctx.log.debug(&format!(
                "ok: run `{}` ({} exists)",
                self.run,
                creates.display()
            ));
            return Ok(false);
        }

        let msg = format!("run `{}`", self.run);
        if ctx.options.dry_run {
            ctx.log.dry_run(&msg);
            return Ok(true);
        }

        let dir = self.dir.as_deref().unwrap_or(&ctx.settings.root);
        ctx.executor.run_in(dir, "sh", &["-c", &self.run])?;
        ctx.log.success(&msg);
        Ok(true)
    }
}

/// A recipe built from one `recipes.toml` table.
#[derive(Debug, Clone)]
pub struct DeclarativeRecipe {
    name: String,
    critical: bool,
    depends_on: Vec<String>,
    os: Vec<String>,
    packages: Vec<PackageRequest>,
    directories: Vec<FsStep>,
    placements: Vec<FsStep>,
    lines: Vec<FsStep>,
    commands: Vec<CommandStep>,
}

impl DeclarativeRecipe {
    /// Build a recipe from its spec, expanding every path against `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Expansion`] if a path references an unknown
    /// variable.
    pub fn from_spec(name: &str, spec: &RecipeSpec, settings: &Settings) -> Result<Self, ConfigError> {
        let packages = spec
            .packages
            .iter()
            .map(|p| match p {
                PackageSpec::Name(name) => PackageRequest::named(name),
                PackageSpec::Detailed {
                    name,
                    bin,
                    fallback,
                } => PackageRequest {
                    name: name.clone(),
                    bin: bin.clone(),
                    fallbacks: fallback.clone(),
                },
            })
            .collect();

        let directories = spec
            .directories
            .iter()
            .map(|d| settings.expand_target(d).map(FsStep::Directory))
            .collect::<Result<_, _>>()?;

        let mut placements = Vec::new();
        for file in &spec.files {
            let content = match (&file.content, &file.source) {
                (Some(text), _) => FileContent::Inline(text.clone()),
                (None, Some(source)) => FileContent::Source(settings.expand_source(source)?),
                (None, None) => FileContent::Inline(String::new()),
            };
            placements.push(FsStep::File {
                target: settings.expand_target(&file.target)?,
                content,
            });
        }
        for link in &spec.symlinks {
            placements.push(FsStep::Symlink {
                source: settings.expand_source(&link.source)?,
                target: settings.expand_target(&link.target)?,
            });
        }
        for tree in &spec.trees {
            placements.push(FsStep::Tree {
                source: settings.expand_source(&tree.source)?,
                target: settings.expand_target(&tree.target)?,
            });
        }

        let lines = spec
            .lines
            .iter()
            .map(|l| {
                Ok(FsStep::Line {
                    file: settings.expand_target(&l.file)?,
                    line: l.line.clone(),
                })
            })
            .collect::<Result<_, ConfigError>>()?;

        let commands = spec
            .commands
            .iter()
            .map(|c| {
                Ok(CommandStep {
                    run: c.run.clone(),
                    dir: c.dir.as_deref().map(|d| settings.expand_target(d)).transpose()?,
                    creates: c
                        .creates
                        .as_deref()
                        .map(|p| settings.expand_target(p))
                        .transpose()?,
                })
            })
            .collect::<Result<_, ConfigError>>()?;

        Ok(Self {
            name: name.to_string(),
            critical: spec.critical,
            depends_on: spec.depends_on.clone(),
            os: spec.os.clone(),
            packages,
            directories,
            placements,
            lines,
            commands,
        })
    }
}

impl Recipe for DeclarativeRecipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn critical(&self) -> bool {
        self.critical
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    fn applies_to(&self, platform: &PlatformInfo) -> bool {
        self.os.is_empty() || self.os.iter().any(|tag| platform.os.matches_tag(tag))
    }

    fn run(&self, ctx: &Context) -> Result<InstallResult> {
        let mut changed = false;

        let installer = ctx.installer();
        let opts = ctx.options.install_options();
        for request in &self.packages {
            match installer.install_request(request, opts) {
                InstallResult::Success => changed = true,
                InstallResult::SkippedAlreadyInstalled => {}
                InstallResult::FailedFallbackExhausted(reason) => {
                    return Ok(InstallResult::FailedFallbackExhausted(install_failure(
                        request, reason,
                    )));
                }
                InstallResult::FailedFatal(reason) => {
                    return Ok(InstallResult::FailedFatal(install_failure(request, reason)));
                }
            }
        }

        for phase in [&self.directories, &self.placements, &self.lines] {
            let (phase_changed, errors) = run_phase(ctx, phase);
            changed |= phase_changed;
            if !errors.is_empty() {
                return Ok(InstallResult::FailedFatal(errors.join("; ")));
            }
        }

        for command in &self.commands {
            match command.execute(ctx) {
                Ok(ran) => changed |= ran,
                Err(e) => return Ok(InstallResult::FailedFatal(format!("{e:#}"))),
            }
        }

        Ok(if changed {
            InstallResult::Success
        } else {
            InstallResult::SkippedAlreadyInstalled
        })
    }
}

fn install_failure(request: &PackageRequest, reason: String) -> String {
    ProvisionError::InstallFailed {
        package: request.name.clone(),
        reason,
    }
    .to_string()
}

/// Whether any destination in `steps` equals or lies inside another.
fn overlapping(steps: &[FsStep]) -> bool {
    steps.iter().enumerate().any(|(i, a)| {
        steps.iter().skip(i + 1).any(|b| {
            let (a, b) = (a.destination(), b.destination());
            a.starts_with(b) || b.starts_with(a)
        })
    })
}

/// Apply every step of one phase and join them.
///
/// Returns whether any step changed something, plus every failure message.
fn run_phase(ctx: &Context, steps: &[FsStep]) -> (bool, Vec<String>) {
    let results: Vec<Result<Mutation, ProvisionError>> =
        if ctx.parallel && steps.len() > 1 && !overlapping(steps) {
            use rayon::prelude::*;
            steps.par_iter().map(|s| s.apply(&ctx.guard)).collect()
        } else {
            steps.iter().map(|s| s.apply(&ctx.guard)).collect()
        };

    let mut changed = false;
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(mutation) => changed |= mutation.is_change(),
            Err(e) => {
                let reason = e.to_string();
                ctx.log.error(&reason);
                errors.push(reason);
            }
        }
    }
    (changed, errors)
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::unreachable
)]
mod tests {
    use super::*;
    use crate::exec::Executor;
    use crate::exec::test_helpers::ScriptedExecutor;
    use crate::platform::{Arch, Os};
    use crate::recipes::ExecutionContext;
    use crate::recipes::test_helpers::{context_in, settings_in};
    use std::sync::Arc;

    fn spec(toml_src: &str) -> RecipeSpec {
        toml::from_str(toml_src).unwrap()
    }

    fn build(dir: &Path, toml_src: &str) -> DeclarativeRecipe {
        DeclarativeRecipe::from_spec("test", &spec(toml_src), &settings_in(dir)).unwrap()
    }

    fn write_source(dir: &Path, rel: &str, content: &str) {
        let path = dir.join("root").join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn backups(dir: &Path) -> usize {
        std::fs::read_dir(dir.join("backups").join("run")).map_or(0, Iterator::count)
    }

    // -----------------------------------------------------------------------
    // from_spec / applies_to
    // -----------------------------------------------------------------------

    #[test]
    fn paths_are_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = build(
            dir.path(),
            r#"
symlinks = [{ source = "dotfiles/zshrc", target = "~/.zshrc" }]
commands = [{ run = "true", dir = "$DEVENV_ROOT", creates = "~/.done" }]
"#,
        );
        assert_eq!(
            recipe.placements,
            vec![FsStep::Symlink {
                source: dir.path().join("root/dotfiles/zshrc"),
                target: dir.path().join("home/.zshrc"),
            }]
        );
        assert_eq!(recipe.commands[0].dir, Some(dir.path().join("root")));
        assert_eq!(recipe.commands[0].creates, Some(dir.path().join("home/.done")));
    }

    #[test]
    fn unknown_variable_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let err = DeclarativeRecipe::from_spec(
            "bad",
            &spec("directories = [\"$WHO/x\"]"),
            &settings_in(dir.path()),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Expansion { .. }));
    }

    #[test]
    fn os_restriction() {
        let dir = tempfile::tempdir().unwrap();
        let mac_only = build(dir.path(), "os = [\"macos\"]\ndirectories = [\"x\"]");
        let any = build(dir.path(), "directories = [\"x\"]");
        let linux = PlatformInfo::new(Os::Linux, Arch::X86_64, vec![]);
        let darwin = PlatformInfo::new(Os::Darwin, Arch::Arm64, vec![]);

        assert!(!mac_only.applies_to(&linux));
        assert!(mac_only.applies_to(&darwin));
        assert!(any.applies_to(&linux));
    }

    // -----------------------------------------------------------------------
    // run
    // -----------------------------------------------------------------------

    #[test]
    fn second_run_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "dotfiles/zshrc", "export ZSH=1\n");
        let recipe = build(
            dir.path(),
            r#"
packages = ["zsh"]
directories = ["~/.cache/zsh"]
symlinks = [{ source = "dotfiles/zshrc", target = "~/.zshrc" }]
files = [{ target = "~/.hushlogin", content = "" }]
lines = [{ file = "~/.profile", line = "export SHELL=/bin/zsh" }]
"#,
        );
        let exec = Arc::new(ScriptedExecutor::new().on_path(&["zsh"]));
        let (ctx, _log) = context_in(dir.path(), exec, ExecutionContext::default());

        assert_eq!(recipe.run(&ctx).unwrap(), InstallResult::Success);
        let home = dir.path().join("home");
        assert!(home.join(".cache/zsh").is_dir());
        assert_eq!(
            std::fs::read_link(home.join(".zshrc")).unwrap(),
            dir.path().join("root/dotfiles/zshrc")
        );
        assert_eq!(
            std::fs::read_to_string(home.join(".profile")).unwrap(),
            "export SHELL=/bin/zsh\n"
        );

        assert_eq!(recipe.run(&ctx).unwrap(), InstallResult::SkippedAlreadyInstalled);
        assert_eq!(backups(dir.path()), 0);
    }

    #[test]
    fn existing_destination_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "dotfiles/vimrc", "set nu\n");
        let home = dir.path().join("home");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::write(home.join(".vimrc"), "old\n").unwrap();

        let recipe = build(
            dir.path(),
            "symlinks = [{ source = \"dotfiles/vimrc\", target = \"~/.vimrc\" }]",
        );
        let (ctx, _log) = context_in(
            dir.path(),
            Arc::new(ScriptedExecutor::new()),
            ExecutionContext::default(),
        );

        assert_eq!(recipe.run(&ctx).unwrap(), InstallResult::Success);
        assert_eq!(backups(dir.path()), 1);
        assert_eq!(ctx.guard.store().records()[0].original_path, home.join(".vimrc"));
    }

    #[test]
    fn exhausted_package_stops_before_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = build(dir.path(), "packages = [\"go\"]\ndirectories = [\"~/go\"]");
        let (ctx, _log) = context_in(
            dir.path(),
            Arc::new(ScriptedExecutor::new()),
            ExecutionContext::default(),
        );

        let result = recipe.run(&ctx).unwrap();
        assert!(
            matches!(&result, InstallResult::FailedFallbackExhausted(r) if r.starts_with("Installation of 'go' failed: ")),
            "{result:?}"
        );
        assert!(!dir.path().join("home/go").exists());
    }

    #[test]
    fn phase_failures_are_aggregated() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "a", "a");
        let home = dir.path().join("home");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::write(home.join("blocker"), "").unwrap();

        let recipe = build(
            dir.path(),
            r#"
symlinks = [
  { source = "a", target = "~/blocker/one" },
  { source = "a", target = "~/blocker/two" },
  { source = "a", target = "~/ok" },
]
lines = [{ file = "~/.profile", line = "never" }]
"#,
        );
        let (ctx, log) = context_in(
            dir.path(),
            Arc::new(ScriptedExecutor::new()),
            ExecutionContext::default(),
        );

        let InstallResult::FailedFatal(reason) = recipe.run(&ctx).unwrap() else {
            unreachable!("expected a fatal result");
        };
        assert!(reason.contains("blocker/one"), "{reason}");
        assert!(reason.contains("blocker/two"), "{reason}");
        assert_eq!(log.messages("error").len(), 2);
        assert!(home.join("ok").is_symlink());
        assert!(!home.join(".profile").exists());
    }

    #[test]
    fn tree_over_linked_directory_leaves_link_source_intact() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "dotfiles/nvim/init.lua", "repo original");
        write_source(dir.path(), "dotfiles/config/nvim/init.lua", "tree version");
        let recipe = build(
            dir.path(),
            r#"
symlinks = [{ source = "dotfiles/nvim", target = "$XDG_CONFIG_HOME/nvim" }]
trees = [{ source = "dotfiles/config", target = "$XDG_CONFIG_HOME" }]
"#,
        );
        let (ctx, _log) = context_in(
            dir.path(),
            Arc::new(ScriptedExecutor::new()),
            ExecutionContext::default(),
        );

        assert_eq!(recipe.run(&ctx).unwrap(), InstallResult::Success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("root/dotfiles/nvim/init.lua")).unwrap(),
            "repo original"
        );
        let nvim = dir.path().join("home/.config/nvim");
        assert!(!nvim.is_symlink());
        assert_eq!(
            std::fs::read_to_string(nvim.join("init.lua")).unwrap(),
            "tree version"
        );
    }

    #[test]
    fn nested_destinations_overlap() {
        let config = PathBuf::from("/home/dev/.config");
        let nested = [
            FsStep::Directory(config.join("nvim")),
            FsStep::Directory(config.clone()),
        ];
        assert!(overlapping(&nested));

        let siblings = [
            FsStep::Directory(config.join("nvim")),
            FsStep::Directory(config.join("nvim-old")),
        ];
        assert!(!overlapping(&siblings));

        let same = [
            FsStep::Directory(config.clone()),
            FsStep::Directory(config),
        ];
        assert!(overlapping(&same));
    }

    #[test]
    fn sequential_mode_gives_same_result() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "a", "a");
        write_source(dir.path(), "b", "b");
        let recipe = build(
            dir.path(),
            r#"
symlinks = [{ source = "a", target = "~/a" }, { source = "b", target = "~/b" }]
"#,
        );
        let (ctx, _log) = context_in(
            dir.path(),
            Arc::new(ScriptedExecutor::new()),
            ExecutionContext::default(),
        );
        let ctx = ctx.with_parallel(false);

        assert_eq!(recipe.run(&ctx).unwrap(), InstallResult::Success);
        assert!(dir.path().join("home/a").is_symlink());
        assert!(dir.path().join("home/b").is_symlink());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "dotfiles/gitconfig", "[user]\n");
        let recipe = build(
            dir.path(),
            r#"
packages = ["git"]
symlinks = [{ source = "dotfiles/gitconfig", target = "~/.gitconfig" }]
commands = [{ run = "git lfs install" }]
"#,
        );
        let exec = Arc::new(ScriptedExecutor::new().on_path(&["apt-get"]));
        let options = ExecutionContext {
            dry_run: true,
            ..ExecutionContext::default()
        };
        let (ctx, log) = context_in(dir.path(), exec.clone(), options);

        assert_eq!(recipe.run(&ctx).unwrap(), InstallResult::Success);
        assert!(!dir.path().join("home").exists());
        assert!(!dir.path().join("backups").exists());
        assert!(!exec.calls().iter().any(|c| c.contains("install -y") || c.starts_with("sh")));
        assert_eq!(log.messages("dry").len(), 3);
    }

    #[test]
    fn file_content_from_source() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "templates/npmrc", "prefix=~/.npm\n");
        let recipe = build(
            dir.path(),
            "files = [{ target = \"~/.npmrc\", source = \"templates/npmrc\" }]",
        );
        let (ctx, _log) = context_in(
            dir.path(),
            Arc::new(ScriptedExecutor::new()),
            ExecutionContext::default(),
        );

        assert_eq!(recipe.run(&ctx).unwrap(), InstallResult::Success);
        let written = dir.path().join("home/.npmrc");
        assert!(!written.is_symlink());
        assert_eq!(std::fs::read_to_string(written).unwrap(), "prefix=~/.npm\n");
    }

    #[test]
    fn commands_honour_creates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("home")).unwrap();
        std::fs::write(dir.path().join("home/.oh-my-zsh"), "").unwrap();
        let recipe = build(
            dir.path(),
            r#"
commands = [
  { run = "install-omz", creates = "~/.oh-my-zsh" },
  { run = "compinit" },
]
"#,
        );
        let exec = Arc::new(ScriptedExecutor::new().succeed("sh -c compinit", ""));
        let (ctx, log) = context_in(dir.path(), exec.clone(), ExecutionContext::default());

        assert_eq!(recipe.run(&ctx).unwrap(), InstallResult::Success);
        assert_eq!(exec.calls(), vec!["sh -c compinit"]);
        assert_eq!(log.messages("success"), vec!["run `compinit`"]);
    }

    #[test]
    fn failing_command_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let recipe = build(dir.path(), "commands = [{ run = \"exit 3\" }]");
        let exec: Arc<dyn Executor> =
            Arc::new(ScriptedExecutor::new().fail("sh -c exit 3", "boom"));
        let (ctx, _log) = context_in(dir.path(), exec, ExecutionContext::default());

        let result = recipe.run(&ctx).unwrap();
        assert!(
            matches!(&result, InstallResult::FailedFatal(r) if r.contains("boom")),
            "{result:?}"
        );
    }
}
