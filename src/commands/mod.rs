//! Top-level subcommand orchestration.
pub mod check;
pub mod install;
pub mod list;
pub mod version;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, Settings};
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::PlatformInfo;
use crate::recipes::RecipeRegistry;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection, configuration loading and recipe
/// registration so that each command does not have to repeat the
/// boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Resolved locations.
    pub settings: Arc<Settings>,
    /// Detected platform.
    pub platform: Arc<PlatformInfo>,
    /// Parsed configuration files.
    pub config: Config,
    /// Registered recipes.
    pub registry: RecipeRegistry,
}

impl CommandSetup {
    /// Detect the platform, load all configuration and register recipes.
    ///
    /// Configuration warnings are logged, never fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file fails to parse or a recipe
    /// path cannot be expanded.
    pub fn init(settings: Settings, log: &dyn Log, executor: &dyn Executor) -> Result<Self> {
        let platform = PlatformInfo::detect(executor);
        log.info(&format!("platform: {platform}"));
        log.debug(&format!("root: {}", settings.root.display()));

        log.stage("Loading configuration");
        let config = Config::load(&settings)?;
        log.debug(&format!("{} recipes", config.recipes.len()));
        log.debug(&format!("{} package name mappings", config.names.len()));

        if !config.warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                config.warnings.len()
            ));
            for warning in &config.warnings {
                log.warn(&format!("  {warning}"));
            }
        }

        let registry = RecipeRegistry::from_table(&config.recipes, &settings)?;
        log.info(&format!("loaded {} recipes", registry.len()));

        Ok(Self {
            settings: Arc::new(settings),
            platform: Arc::new(platform),
            config,
            registry,
        })
    }
}
