//! Per-run state threaded through every recipe.
use std::sync::Arc;

use crate::config::Settings;
use crate::exec::Executor;
use crate::guard::MutationGuard;
use crate::installer::names::NameMap;
use crate::installer::{InstallOptions, Installer};
use crate::logging::Log;
use crate::platform::PlatformInfo;

/// Per-invocation options, created once and read by every recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Report intended changes without performing them.
    pub dry_run: bool,
    /// Reinstall packages even when present.
    pub force_install: bool,
    /// Only recipes whose name contains this substring run.
    pub filter: Option<String>,
}

impl ExecutionContext {
    /// Whether `name` passes the filter.
    #[must_use]
    pub fn selects(&self, name: &str) -> bool {
        self.filter.as_deref().is_none_or(|f| name.contains(f))
    }

    /// Installer options implied by `--force`.
    #[must_use]
    pub fn install_options(&self) -> InstallOptions {
        if self.force_install {
            InstallOptions::forced()
        } else {
            InstallOptions::default()
        }
    }
}

/// Shared state handed to every recipe.
pub struct Context {
    /// Detected platform, immutable for the run.
    pub platform: Arc<PlatformInfo>,
    /// Invocation options.
    pub options: ExecutionContext,
    /// Resolved root, home and backup locations.
    pub settings: Arc<Settings>,
    /// Logger for output and recipe recording.
    pub log: Arc<dyn Log>,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Guard wrapping every filesystem mutation.
    pub guard: Arc<MutationGuard>,
    /// Logical to concrete package names.
    pub names: Arc<NameMap>,
    /// Whether independent filesystem steps run on the Rayon pool.
    pub parallel: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.platform)
            .field("options", &self.options)
            .field("settings", &self.settings)
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .field("guard", &self.guard)
            .field("names", &self.names.len())
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl Context {
    /// Creates a context whose guard backs up into `settings.backup_root`.
    #[must_use]
    pub fn new(
        platform: Arc<PlatformInfo>,
        options: ExecutionContext,
        settings: Arc<Settings>,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        names: Arc<NameMap>,
    ) -> Self {
        let guard = Arc::new(MutationGuard::new(
            &settings.backup_root,
            options.dry_run,
            Arc::clone(&log),
        ));
        Self {
            platform,
            options,
            settings,
            log,
            executor,
            guard,
            names,
            parallel: true,
        }
    }

    /// Same context with parallel filesystem steps switched on or off.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// An installer bound to this context.
    #[must_use]
    pub fn installer(&self) -> Installer<'_> {
        Installer::new(
            self.executor.as_ref(),
            &self.platform,
            &self.names,
            self.log.as_ref(),
            self.options.dry_run,
        )
    }
}
