//! Package installation with ordered fallbacks.
//!
//! [`Installer::install`] tries the primary manager (Homebrew when present),
//! then on Linux every available system manager in
//! [`PackageManager::SYSTEM_PRIORITY`] order, then any recipe-declared
//! scripts. Manager availability is probed again on every call.
pub mod manager;
pub mod names;
pub mod strategy;

use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::{PackageManager, PlatformInfo};

use names::NameMap;
use strategy::{Outcome, Strategy, run_chain};

/// Uniform result of installing a package or running a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    /// Installed (or, in dry-run, would be installed).
    Success,
    /// Already present; nothing was done.
    SkippedAlreadyInstalled,
    /// Every strategy failed; carries the last error.
    FailedFallbackExhausted(String),
    /// A non-recoverable failure (e.g. a filesystem mutation failed).
    FailedFatal(String),
}

impl InstallResult {
    /// Whether this result is a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::FailedFallbackExhausted(_) | Self::FailedFatal(_))
    }

    /// Failure reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::FailedFallbackExhausted(r) | Self::FailedFatal(r) => Some(r),
            Self::Success | Self::SkippedAlreadyInstalled => None,
        }
    }
}

impl std::fmt::Display for InstallResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::SkippedAlreadyInstalled => write!(f, "already installed"),
            Self::FailedFallbackExhausted(r) => write!(f, "all strategies failed: {r}"),
            Self::FailedFatal(r) => write!(f, "fatal: {r}"),
        }
    }
}

/// Options for a single install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Return [`InstallResult::SkippedAlreadyInstalled`] when the package is present.
    pub skip_if_present: bool,
    /// Use each manager's reinstall form.
    pub reinstall: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            skip_if_present: true,
            reinstall: false,
        }
    }
}

impl InstallOptions {
    /// Options for `--force`: no presence check, reinstall forms.
    #[must_use]
    pub const fn forced() -> Self {
        Self {
            skip_if_present: false,
            reinstall: true,
        }
    }
}

/// A package as declared by a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    /// Logical package name.
    pub name: String,
    /// Executable that proves the package is present; defaults to `name`.
    pub bin: Option<String>,
    /// Shell snippets tried after every package manager failed.
    pub fallbacks: Vec<String>,
}

impl PackageRequest {
    /// A request with no binary override and no custom fallbacks.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bin: None,
            fallbacks: Vec::new(),
        }
    }

    /// Executable probed on PATH for the presence check.
    #[must_use]
    pub fn bin(&self) -> &str {
        self.bin.as_deref().unwrap_or(&self.name)
    }
}

/// Installs packages through the available managers.
pub struct Installer<'a> {
    executor: &'a dyn Executor,
    platform: &'a PlatformInfo,
    names: &'a NameMap,
    log: &'a dyn Log,
    dry_run: bool,
}

impl std::fmt::Debug for Installer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("platform", &self.platform)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl<'a> Installer<'a> {
    /// Create an installer.
    #[must_use]
    pub const fn new(
        executor: &'a dyn Executor,
        platform: &'a PlatformInfo,
        names: &'a NameMap,
        log: &'a dyn Log,
        dry_run: bool,
    ) -> Self {
        Self {
            executor,
            platform,
            names,
            log,
            dry_run,
        }
    }

    /// Install a package by logical name.
    pub fn install(&self, package: &str, opts: InstallOptions) -> InstallResult {
        self.install_request(&PackageRequest::named(package), opts)
    }

    /// Package managers usable right now, primary first.
    ///
    /// System managers only count on Linux.
    #[must_use]
    pub fn available_managers(&self) -> Vec<PackageManager> {
        let mut managers = Vec::new();
        if self.executor.which(PackageManager::Brew.executable()) {
            managers.push(PackageManager::Brew);
        }
        if self.platform.is_linux() {
            managers.extend(
                PackageManager::SYSTEM_PRIORITY
                    .into_iter()
                    .filter(|m| self.executor.which(m.executable())),
            );
        }
        managers
    }

    /// The ordered strategy chain for `request`.
    #[must_use]
    pub fn strategies(&self, request: &PackageRequest) -> Vec<Strategy> {
        self.available_managers()
            .into_iter()
            .map(Strategy::Manager)
            .chain(request.fallbacks.iter().cloned().map(Strategy::Script))
            .collect()
    }

    /// Whether `request` is already installed: the primary manager reports
    /// it, or its executable is on PATH.
    #[must_use]
    pub fn is_present(&self, request: &PackageRequest) -> bool {
        if self.executor.which(request.bin()) {
            return true;
        }
        self.available_managers().first().is_some_and(|primary| {
            let query = primary.query_command(self.names.resolve(&request.name, *primary));
            self.executor
                .run_unchecked(&query.program, &query.arg_refs())
                .is_ok_and(|r| r.success)
        })
    }

    /// Install `request`, walking the fallback chain until a strategy succeeds.
    pub fn install_request(&self, request: &PackageRequest, opts: InstallOptions) -> InstallResult {
        let name = &request.name;
        if opts.skip_if_present && self.is_present(request) {
            self.log.debug(&format!("ok: {name} (already installed)"));
            return InstallResult::SkippedAlreadyInstalled;
        }

        let chain = self.strategies(request);
        let Some(first) = chain.first() else {
            return InstallResult::FailedFallbackExhausted(format!(
                "no package manager or fallback available for {name}"
            ));
        };

        if self.dry_run {
            self.log.dry_run(&format!("install {name} via {first}"));
            return InstallResult::Success;
        }

        let attempts = run_chain(&chain, |strategy| {
            self.log.debug(&format!("trying {strategy} for {name}"));
            match self.attempt(strategy, request, opts) {
                Ok(()) => Outcome::Installed,
                Err(e) => {
                    let reason = format!("{e:#}");
                    self.log
                        .warn(&format!("{name}: {strategy} failed: {reason}"));
                    Outcome::Failed(reason)
                }
            }
        });

        match attempts.last() {
            Some(last) if last.outcome == Outcome::Installed => {
                self.log
                    .success(&format!("install {name} via {}", last.strategy));
                InstallResult::Success
            }
            Some(strategy::Attempt {
                outcome: Outcome::Failed(reason),
                ..
            }) => InstallResult::FailedFallbackExhausted(reason.clone()),
            _ => InstallResult::FailedFallbackExhausted(format!("no strategy attempted for {name}")),
        }
    }

    fn attempt(
        &self,
        strategy: &Strategy,
        request: &PackageRequest,
        opts: InstallOptions,
    ) -> anyhow::Result<()> {
        match strategy {
            Strategy::Manager(manager) => {
                let concrete = self.names.resolve(&request.name, *manager);
                let cmd = manager.install_command(concrete, opts.reinstall, self.platform.elevated);
                self.executor.run(&cmd.program, &cmd.arg_refs())?;
            }
            Strategy::Script(script) => {
                self.executor.run("sh", &["-c", script])?;
            }
        }
        Ok(())
    }
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
    use crate::exec::test_helpers::ScriptedExecutor;
    use crate::logging::MemoryLog;
    use crate::platform::{Arch, Os};

    fn linux() -> PlatformInfo {
        PlatformInfo::new(Os::Linux, Arch::X86_64, vec![])
    }

    fn darwin() -> PlatformInfo {
        PlatformInfo::new(Os::Darwin, Arch::Arm64, vec![])
    }

    fn install(
        exec: &ScriptedExecutor,
        platform: &PlatformInfo,
        request: &PackageRequest,
        opts: InstallOptions,
    ) -> (InstallResult, MemoryLog) {
        let log = MemoryLog::default();
        let names = NameMap::builtin();
        let installer = Installer::new(exec, platform, &names, &log, false);
        let result = installer.install_request(request, opts);
        (result, log)
    }

    fn install_commands(exec: &ScriptedExecutor) -> Vec<String> {
        exec.calls()
            .into_iter()
            .filter(|c| !c.starts_with("dpkg") && !c.starts_with("brew list"))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------------

    #[test]
    fn skips_when_binary_on_path() {
        let exec = ScriptedExecutor::new().on_path(&["brew", "zsh"]);
        let (result, _) = install(
            &exec,
            &darwin(),
            &PackageRequest::named("zsh"),
            InstallOptions::default(),
        );
        assert_eq!(result, InstallResult::SkippedAlreadyInstalled);
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn skips_when_primary_manager_reports_installed() {
        let exec = ScriptedExecutor::new()
            .on_path(&["apt-get"])
            .succeed("dpkg -s fd-find", "Status: install ok installed");
        let mut request = PackageRequest::named("fd");
        request.bin = Some("fdfind".to_string());
        let (result, _) = install(&exec, &linux(), &request, InstallOptions::default());
        assert_eq!(result, InstallResult::SkippedAlreadyInstalled);
    }

    #[test]
    fn force_skips_presence_check_and_reinstalls() {
        let exec = ScriptedExecutor::new()
            .on_path(&["brew", "go"])
            .succeed("brew reinstall go", "");
        let (result, _) = install(
            &exec,
            &darwin(),
            &PackageRequest::named("go"),
            InstallOptions::forced(),
        );
        assert_eq!(result, InstallResult::Success);
        assert_eq!(exec.calls(), vec!["brew reinstall go"]);
    }

    // -----------------------------------------------------------------------
    // Fallback ordering
    // -----------------------------------------------------------------------

    #[test]
    fn falls_back_in_priority_order_and_stops_at_first_success() {
        let exec = ScriptedExecutor::new()
            .on_path(&["brew", "zypper", "dnf", "apt-get", "pacman"])
            .fail("brew install ripgrep", "Error: no bottle")
            .fail("sudo apt-get install -y ripgrep", "E: Unable to locate package")
            .succeed("sudo pacman -S --needed --noconfirm ripgrep", "");
        let (result, log) = install(
            &exec,
            &linux(),
            &PackageRequest::named("ripgrep"),
            InstallOptions::default(),
        );

        assert_eq!(result, InstallResult::Success);
        assert_eq!(
            install_commands(&exec),
            vec![
                "brew install ripgrep",
                "sudo apt-get install -y ripgrep",
                "sudo pacman -S --needed --noconfirm ripgrep",
            ]
        );
        assert_eq!(log.messages("warn").len(), 2);
        assert_eq!(
            log.messages("success"),
            vec!["install ripgrep via pacman"]
        );
    }

    #[test]
    fn exhausted_chain_reports_last_error() {
        let exec = ScriptedExecutor::new()
            .on_path(&["dnf", "yum"])
            .fail("sudo dnf install -y golang", "No match for argument: golang")
            .fail("sudo yum install -y golang", "No package golang available.");
        let (result, _) = install(
            &exec,
            &linux(),
            &PackageRequest::named("go"),
            InstallOptions::default(),
        );

        let InstallResult::FailedFallbackExhausted(reason) = result else {
            unreachable!("expected exhaustion, got {result:?}");
        };
        assert!(reason.contains("No package golang available."), "{reason}");
    }

    #[test]
    fn darwin_never_tries_system_managers() {
        let exec = ScriptedExecutor::new()
            .on_path(&["brew", "apt-get"])
            .fail("brew install tmux", "boom");
        let (result, _) = install(
            &exec,
            &darwin(),
            &PackageRequest::named("tmux"),
            InstallOptions::default(),
        );
        assert!(result.is_failure());
        assert_eq!(install_commands(&exec), vec!["brew install tmux"]);
    }

    #[test]
    fn custom_fallbacks_run_after_managers() {
        let exec = ScriptedExecutor::new()
            .on_path(&["apt-get"])
            .fail("sudo apt-get install -y starship", "E: Unable to locate package")
            .succeed("sh -c curl -sS https://starship.rs/install.sh | sh -s -- -y", "");
        let request = PackageRequest {
            name: "starship".to_string(),
            bin: None,
            fallbacks: vec!["curl -sS https://starship.rs/install.sh | sh -s -- -y".to_string()],
        };
        let (result, log) = install(&exec, &linux(), &request, InstallOptions::default());
        assert_eq!(result, InstallResult::Success);
        assert_eq!(log.messages("success").len(), 1);
        assert!(log.messages("success")[0].contains("script"));
    }

    #[test]
    fn root_skips_sudo() {
        let exec = ScriptedExecutor::new()
            .on_path(&["apk"])
            .succeed("apk add python3", "");
        let mut platform = linux();
        platform.elevated = true;
        let (result, _) = install(
            &exec,
            &platform,
            &PackageRequest::named("python"),
            InstallOptions::default(),
        );
        assert_eq!(result, InstallResult::Success);
    }

    #[test]
    fn no_strategy_available_is_exhaustion() {
        let exec = ScriptedExecutor::new();
        let (result, _) = install(
            &exec,
            &darwin(),
            &PackageRequest::named("htop"),
            InstallOptions::default(),
        );
        assert!(matches!(result, InstallResult::FailedFallbackExhausted(r) if r.contains("htop")));
    }

    // -----------------------------------------------------------------------
    // Dry run
    // -----------------------------------------------------------------------

    #[test]
    fn dry_run_logs_without_installing() {
        let exec = ScriptedExecutor::new().on_path(&["pacman"]);
        let log = MemoryLog::default();
        let names = NameMap::builtin();
        let platform = linux();
        let installer = Installer::new(&exec, &platform, &names, &log, true);

        let result = installer.install("neovim", InstallOptions::default());
        assert_eq!(result, InstallResult::Success);
        assert_eq!(log.messages("dry"), vec!["install neovim via pacman"]);
        assert_eq!(exec.calls(), vec!["pacman -Q neovim"]);
    }
}
