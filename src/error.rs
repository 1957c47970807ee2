//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors (e.g., [`ConfigError`], [`GuardError`])
//! while command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ProvisionError
//! ├── PlatformUnsupported        fatal, raised before any recipe runs
//! ├── InstallFailed              absorbed into a recipe result
//! ├── FilesystemMutation(GuardError)
//! ├── CriticalRecipeFailed       aborts the run
//! ├── NonCriticalRecipeFailed    logged, run continues
//! ├── Config(ConfigError)
//! └── Registry(RegistryError)
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for a provisioning run.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The host operating system is neither Darwin nor Linux.
    #[error("Unsupported platform '{os}': only darwin and linux are supported")]
    PlatformUnsupported {
        /// Kernel name reported by the host.
        os: String,
    },

    /// Every installation strategy for a package failed.
    #[error("Installation of '{package}' failed: {reason}")]
    InstallFailed {
        /// Logical package name.
        package: String,
        /// Last error reported by the strategy chain.
        reason: String,
    },

    /// A guarded filesystem mutation failed.
    #[error("Filesystem mutation failed: {0}")]
    FilesystemMutation(#[from] GuardError),

    /// A recipe marked critical failed; the run was aborted.
    #[error("Critical recipe '{recipe}' failed: {reason}")]
    CriticalRecipeFailed {
        /// Recipe name.
        recipe: String,
        /// Failure reason from the recipe result.
        reason: String,
    },

    /// A non-critical recipe failed; the run continued.
    #[error("Recipe '{recipe}' failed: {reason}")]
    NonCriticalRecipeFailed {
        /// Recipe name.
        recipe: String,
        /// Failure reason from the recipe result.
        reason: String,
    },

    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Recipe registration or ordering failed.
    #[error("Recipe registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors that arise from loading recipe configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A TOML file could not be parsed.
    #[error("Invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// File that failed to parse.
        file: String,
        /// Parser diagnostic.
        message: String,
    },

    /// A path value references an unknown variable or is malformed.
    #[error("Cannot expand path '{value}': {message}")]
    Expansion {
        /// Raw value from the config file.
        value: String,
        /// Expansion diagnostic.
        message: String,
    },

    /// No installation root with a `conf/` directory could be located.
    #[error("Cannot locate devenv root: set DEVENV_ROOT or pass --root")]
    RootNotFound,

    /// `HOME` is unset or empty.
    #[error("HOME is not set")]
    HomeNotFound,
}

/// Errors that arise from recipe registration and ordering.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Two recipes share a name.
    #[error("Duplicate recipe name '{0}'")]
    Duplicate(String),

    /// A recipe depends on a name that is not registered.
    #[error("Recipe '{recipe}' depends on unknown recipe '{dependency}'")]
    MissingDependency {
        /// Declaring recipe.
        recipe: String,
        /// Unknown dependency name.
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    #[error("Recipe dependency cycle detected among: {0}")]
    DependencyCycle(String),
}

/// Errors from guarded filesystem mutations.
#[derive(Error, Debug)]
pub enum GuardError {
    /// The existing destination could not be backed up; nothing was changed.
    #[error("Backup of {} failed: {source}", .path.display())]
    BackupFailed {
        /// Destination that was about to be overwritten.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The mutation failed after any required backup was taken.
    #[error("Cannot {action} {}: {reason}{}", .path.display(), backup_note(.backup.as_ref()))]
    MutationFailed {
        /// Verb describing the mutation (e.g. `link`, `write`).
        action: String,
        /// Destination path.
        path: PathBuf,
        /// Backup left in place, if one was taken.
        backup: Option<PathBuf>,
        /// Underlying error description.
        reason: String,
    },

    /// The desired state cannot be reached (e.g. the link source is missing).
    #[error("Invalid {}: {reason}", .path.display())]
    Invalid {
        /// Destination path.
        path: PathBuf,
        /// Why the state is unreachable.
        reason: String,
    },
}

fn backup_note(backup: Option<&PathBuf>) -> String {
    backup.map_or_else(String::new, |b| {
        format!(" (previous content kept at {})", b.display())
    })
}
