//! Command: provision the environment.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::config::Settings;
use crate::engine::{Engine, RunReport};
use crate::error::ProvisionError;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::recipes::{Context, ExecutionContext};

use super::CommandSetup;

/// Run the install command.
///
/// # Errors
///
/// Returns an error if settings or configuration cannot be resolved, the
/// platform is unsupported, or a critical recipe failed.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    let settings = Settings::resolve(global.root.as_deref())?;
    let report = execute(settings, global, opts, log.clone(), Arc::new(SystemExecutor))?;

    log.print_summary();

    if let Some((recipe, reason)) = report.abort_cause() {
        return Err(ProvisionError::CriticalRecipeFailed {
            recipe: recipe.to_string(),
            reason: reason.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Provision with explicit settings and executor, returning the run report.
///
/// Writes the backup manifest when any backup was taken, including on a
/// critical abort.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, the platform is
/// unsupported, or the recipe graph has no valid order.
pub fn execute(
    settings: Settings,
    global: &GlobalOpts,
    opts: &InstallOpts,
    log: Arc<dyn Log>,
    executor: Arc<dyn Executor>,
) -> Result<RunReport> {
    log.info(&format!("devenv {}", super::version::version()));
    if global.dry_run {
        log.info("dry run: no changes will be made");
    }

    let CommandSetup {
        settings,
        platform,
        config,
        registry,
    } = CommandSetup::init(settings, log.as_ref(), executor.as_ref())?;

    let options = ExecutionContext {
        dry_run: global.dry_run,
        force_install: opts.force,
        filter: opts.filter.clone(),
    };
    let ctx = Context::new(
        platform,
        options,
        settings,
        Arc::clone(&log),
        executor,
        Arc::new(config.names),
    )
    .with_parallel(global.parallel);

    let report = Engine::new(&registry).run(&ctx)?;

    if let Some(manifest) = ctx.guard.store().write_manifest()? {
        log.info(&format!("backups recorded in {}", manifest.display()));
    }

    Ok(report)
}
