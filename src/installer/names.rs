//! Logical-to-concrete package name mapping.
use std::collections::BTreeMap;

use crate::platform::PackageManager;

/// Maps a logical package name to the name a specific manager knows it by.
///
/// Names without a mapping resolve to themselves.
///
/// # Examples
///
/// ```
/// use devenv_cli::installer::names::NameMap;
/// use devenv_cli::platform::PackageManager;
///
/// let names = NameMap::builtin();
/// assert_eq!(names.resolve("fd", PackageManager::Apt), "fd-find");
/// assert_eq!(names.resolve("fd", PackageManager::Brew), "fd");
/// assert_eq!(names.resolve("ripgrep", PackageManager::Pacman), "ripgrep");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    entries: BTreeMap<String, BTreeMap<PackageManager, String>>,
}

impl NameMap {
    /// An empty map; every name resolves to itself.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mappings for well-known packages whose names differ between managers.
    #[must_use]
    pub fn builtin() -> Self {
        use PackageManager::{Apk, Apt, Dnf, Yum};

        let mut map = Self::new();
        for manager in [Apt, Dnf, Yum] {
            map.insert("fd", manager, "fd-find");
        }
        for manager in [Apt, Dnf, Yum, Apk] {
            map.insert("python", manager, "python3");
        }
        map.insert("pip", Apt, "python3-pip");
        map.insert("pip", Dnf, "python3-pip");
        map.insert("pip", Yum, "python3-pip");
        map.insert("pip", Apk, "py3-pip");
        map.insert("go", Apt, "golang-go");
        map.insert("go", Dnf, "golang");
        map.insert("go", Yum, "golang");
        map
    }

    /// Add or replace one mapping.
    pub fn insert(&mut self, logical: &str, manager: PackageManager, concrete: &str) {
        self.entries
            .entry(logical.to_string())
            .or_default()
            .insert(manager, concrete.to_string());
    }

    /// Overlay every mapping from `other` onto this map.
    pub fn merge(&mut self, other: &Self) {
        for (logical, per_manager) in &other.entries {
            for (manager, concrete) in per_manager {
                self.insert(logical, *manager, concrete);
            }
        }
    }

    /// Concrete name of `logical` for `manager`.
    #[must_use]
    pub fn resolve<'a>(&'a self, logical: &'a str, manager: PackageManager) -> &'a str {
        self.entries
            .get(logical)
            .and_then(|m| m.get(&manager))
            .map_or(logical, String::as_str)
    }

    /// Number of logical names with at least one mapping.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
