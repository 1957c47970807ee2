//! Settings resolution and recipe configuration loading.
//!
//! [`Settings`] is resolved once at start-up from the CLI and the process
//! environment; everything downstream receives it by reference. [`Config`]
//! holds the parsed files under `<root>/conf/`.
pub mod package_names;
pub mod recipes;
pub mod toml_loader;
pub mod validation;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::installer::names::NameMap;

use recipes::RecipeTable;
use validation::ValidationWarning;

/// Name of the configuration directory under the root.
const CONF_DIR: &str = "conf";

/// Resolved locations for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Installation root (contains `conf/`).
    pub root: PathBuf,
    /// User home directory.
    pub home: PathBuf,
    /// `XDG_CONFIG_HOME` or `~/.config`.
    pub config_home: PathBuf,
    /// Directory receiving per-run backup folders.
    pub backup_root: PathBuf,
}

impl Settings {
    /// Resolve settings from the live process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RootNotFound`] when no root can be located and
    /// [`ConfigError::HomeNotFound`] when `HOME` is unset.
    pub fn resolve(root_override: Option<&Path>) -> Result<Self, ConfigError> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: ".".to_string(),
            source,
        })?;
        Self::resolve_with(
            |key| std::env::var(key).ok(),
            root_override,
            exe_dir.as_deref(),
            &cwd,
        )
    }

    /// Resolve settings from an explicit environment lookup.
    ///
    /// Root precedence: `root_override`, then `DEVENV_ROOT`, then the first
    /// ancestor of `exe_dir` containing `conf/`, then `cwd` if it contains
    /// `conf/`.
    ///
    /// # Errors
    ///
    /// See [`Settings::resolve`].
    pub fn resolve_with(
        env: impl Fn(&str) -> Option<String>,
        root_override: Option<&Path>,
        exe_dir: Option<&Path>,
        cwd: &Path,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| env(key).filter(|v| !v.is_empty());

        let home = var("HOME").map(PathBuf::from).ok_or(ConfigError::HomeNotFound)?;

        let root = root_override
            .map(Path::to_path_buf)
            .or_else(|| var("DEVENV_ROOT").map(PathBuf::from))
            .or_else(|| {
                exe_dir.and_then(|dir| {
                    dir.ancestors()
                        .find(|a| a.join(CONF_DIR).is_dir())
                        .map(Path::to_path_buf)
                })
            })
            .or_else(|| cwd.join(CONF_DIR).is_dir().then(|| cwd.to_path_buf()))
            .ok_or(ConfigError::RootNotFound)?;

        let config_home = var("XDG_CONFIG_HOME").map_or_else(|| home.join(".config"), PathBuf::from);

        let backup_root = var("DEVENV_BACKUP_DIR").map_or_else(
            || {
                var("XDG_STATE_HOME")
                    .map_or_else(|| home.join(".local").join("state"), PathBuf::from)
                    .join("devenv")
                    .join("backups")
            },
            PathBuf::from,
        );

        Ok(Self {
            root,
            home,
            config_home,
            backup_root,
        })
    }

    /// The `conf/` directory under the root.
    #[must_use]
    pub fn conf_dir(&self) -> PathBuf {
        self.root.join(CONF_DIR)
    }

    /// Expand a recipe source path; relative results resolve against the root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Expansion`] for unknown variables.
    pub fn expand_source(&self, raw: &str) -> Result<PathBuf, ConfigError> {
        Ok(self.root.join(self.expand(raw)?))
    }

    /// Expand a recipe target path; relative results resolve against home.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Expansion`] for unknown variables.
    pub fn expand_target(&self, raw: &str) -> Result<PathBuf, ConfigError> {
        Ok(self.home.join(self.expand(raw)?))
    }

    /// Expand `~`, `$HOME`, `$DEVENV_ROOT` and `$XDG_CONFIG_HOME` from these
    /// settings. The live environment is never consulted.
    fn expand(&self, raw: &str) -> Result<String, ConfigError> {
        let lookup = |name: &str| -> Result<Option<String>, String> {
            let path = match name {
                "HOME" => &self.home,
                "DEVENV_ROOT" => &self.root,
                "XDG_CONFIG_HOME" => &self.config_home,
                _ => return Err("unknown variable".to_string()),
            };
            Ok(Some(path.display().to_string()))
        };
        let home = self.home.to_string_lossy();
        shellexpand::full_with_context(raw, || Some(home), lookup)
            .map(std::borrow::Cow::into_owned)
            .map_err(|e| ConfigError::Expansion {
                value: raw.to_string(),
                message: format!("${}: {}", e.var_name, e.cause),
            })
    }
}

/// Parsed configuration files.
#[derive(Debug, Default)]
pub struct Config {
    /// Recipes from `recipes.toml`.
    pub recipes: RecipeTable,
    /// Built-in package names merged with `package-names.toml`.
    pub names: NameMap,
    /// Non-fatal issues found while loading.
    pub warnings: Vec<ValidationWarning>,
}

impl Config {
    /// Load every file under `settings.conf_dir()` and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read or parsed.
    pub fn load(settings: &Settings) -> Result<Self> {
        let conf = settings.conf_dir();

        let recipes =
            recipes::load(&conf.join("recipes.toml")).context("loading recipes.toml")?;
        let (names, mut warnings) = package_names::load(&conf.join("package-names.toml"))
            .context("loading package-names.toml")?;

        warnings.extend(validation::validate(&recipes, settings));

        Ok(Self {
            recipes,
            names,
            warnings,
        })
    }
}
