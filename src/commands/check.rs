//! Command: validate configuration.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::exec::SystemExecutor;
use crate::logging::Log;

use super::CommandSetup;

/// Run the check command: load and validate configuration.
///
/// Warnings are printed during setup.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, the recipe graph has
/// no valid order, or any validation warning was found.
pub fn run(global: &GlobalOpts, log: &dyn Log) -> Result<()> {
    let settings = Settings::resolve(global.root.as_deref())?;
    let setup = CommandSetup::init(settings, log, &SystemExecutor)?;

    log.stage("Checking recipe order");
    let order = setup.registry.ordered()?;
    log.success(&format!("{} recipes resolve to a valid order", order.len()));

    let count = setup.config.warnings.len();
    if count > 0 {
        anyhow::bail!("configuration has {count} warning(s)");
    }
    log.success("configuration is valid");
    Ok(())
}
