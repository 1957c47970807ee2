//! `package-names.toml`: per-manager package name overrides.
//!
//! ```toml
//! [fd]
//! apt = "fd-find"
//!
//! [neovim]
//! apk = "nvim"
//! ```
use std::collections::BTreeMap;
use std::path::Path;

use super::toml_loader::load_config;
use super::validation::ValidationWarning;
use crate::error::ConfigError;
use crate::installer::names::NameMap;
use crate::platform::PackageManager;

/// Source name used in validation warnings.
const SOURCE: &str = "package-names.toml";

/// Load overrides and merge them on top of the built-in mappings.
///
/// Unknown manager identifiers are reported as warnings and ignored.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(path: &Path) -> Result<(NameMap, Vec<ValidationWarning>), ConfigError> {
    let raw: BTreeMap<String, BTreeMap<String, String>> = load_config(path)?;

    let mut overrides = NameMap::new();
    let mut warnings = Vec::new();
    for (logical, per_manager) in &raw {
        for (manager_id, concrete) in per_manager {
            match PackageManager::from_id(manager_id) {
                Some(manager) => overrides.insert(logical, manager, concrete),
                None => warnings.push(ValidationWarning::new(
                    SOURCE,
                    logical,
                    format!("unknown package manager '{manager_id}'"),
                )),
            }
        }
    }

    let mut names = NameMap::builtin();
    names.merge(&overrides);
    Ok((names, warnings))
}
