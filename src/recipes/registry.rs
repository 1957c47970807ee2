//! Recipe collection and deterministic ordering.
use std::collections::{BTreeMap, BTreeSet};

use crate::config::Settings;
use crate::config::recipes::RecipeTable;
use crate::error::{ProvisionError, RegistryError};

use super::Recipe;
use super::declarative::DeclarativeRecipe;

/// Recipes keyed by name.
#[derive(Default)]
pub struct RecipeRegistry {
    recipes: BTreeMap<String, Box<dyn Recipe>>,
}

impl std::fmt::Debug for RecipeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.recipes.keys()).finish()
    }
}

impl RecipeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from parsed `recipes.toml`, expanding paths.
    ///
    /// # Errors
    ///
    /// Returns an error if a path cannot be expanded.
    pub fn from_table(table: &RecipeTable, settings: &Settings) -> Result<Self, ProvisionError> {
        let mut registry = Self::new();
        for (name, spec) in table {
            registry.register(Box::new(DeclarativeRecipe::from_spec(name, spec, settings)?))?;
        }
        Ok(registry)
    }

    /// Add a recipe.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the name is taken.
    pub fn register(&mut self, recipe: Box<dyn Recipe>) -> Result<(), RegistryError> {
        let name = recipe.name().to_string();
        if self.recipes.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.recipes.insert(name, recipe);
        Ok(())
    }

    /// Number of registered recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Whether no recipes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Look up a recipe by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Recipe> {
        self.recipes.get(name).map(Box::as_ref)
    }

    /// Execution order: lexicographic by name, refined so every dependency
    /// runs before its dependents.
    ///
    /// Kahn's algorithm over a sorted ready set; among recipes whose
    /// dependencies are satisfied, the smallest name goes next.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MissingDependency`] for an unknown dependency
    /// and [`RegistryError::DependencyCycle`] when no order exists.
    pub fn ordered(&self) -> Result<Vec<&dyn Recipe>, RegistryError> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for (name, recipe) in &self.recipes {
            let deps: BTreeSet<&str> = recipe.depends_on().iter().map(String::as_str).collect();
            for dep in &deps {
                if !self.recipes.contains_key(*dep) {
                    return Err(RegistryError::MissingDependency {
                        recipe: name.clone(),
                        dependency: (*dep).to_string(),
                    });
                }
                dependents.entry(*dep).or_default().push(name.as_str());
            }
            in_degree.insert(name.as_str(), deps.len());
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter_map(|(name, &d)| (d == 0).then_some(*name))
            .collect();
        let mut order = Vec::with_capacity(self.recipes.len());

        while let Some(name) = ready.pop_first() {
            if let Some(recipe) = self.get(name) {
                order.push(recipe);
            }
            for dependent in dependents.get(name).into_iter().flatten() {
                if let Some(count) = in_degree.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() != self.recipes.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .filter_map(|(name, &d)| (d > 0).then_some(*name))
                .collect();
            return Err(RegistryError::DependencyCycle(stuck.join(", ")));
        }

        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::installer::InstallResult;
    use crate::recipes::Context;
    use anyhow::Result;

    struct Named {
        name: &'static str,
        deps: Vec<String>,
    }

    impl Recipe for Named {
        fn name(&self) -> &str {
            self.name
        }
        fn depends_on(&self) -> &[String] {
            &self.deps
        }
        fn run(&self, _ctx: &Context) -> Result<InstallResult> {
            Ok(InstallResult::Success)
        }
    }

    fn recipe(name: &'static str, deps: &[&str]) -> Box<dyn Recipe> {
        Box::new(Named {
            name,
            deps: deps.iter().map(ToString::to_string).collect(),
        })
    }

    fn order_of(registry: &RecipeRegistry) -> Vec<String> {
        registry
            .ordered()
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    #[test]
    fn independent_recipes_sort_by_name() {
        let mut registry = RecipeRegistry::new();
        for name in ["zsh", "go", "libs"] {
            registry.register(recipe(name, &[])).unwrap();
        }
        assert_eq!(order_of(&registry), vec!["go", "libs", "zsh"]);
    }

    #[test]
    fn dependencies_run_first() {
        let mut registry = RecipeRegistry::new();
        registry.register(recipe("alacritty", &["fonts"])).unwrap();
        registry.register(recipe("fonts", &[])).unwrap();
        registry.register(recipe("bat", &[])).unwrap();
        assert_eq!(order_of(&registry), vec!["bat", "fonts", "alacritty"]);
    }

    #[test]
    fn diamond_breaks_ties_lexicographically() {
        let mut registry = RecipeRegistry::new();
        registry.register(recipe("d", &["c", "b"])).unwrap();
        registry.register(recipe("c", &["a"])).unwrap();
        registry.register(recipe("b", &["a"])).unwrap();
        registry.register(recipe("a", &[])).unwrap();
        assert_eq!(order_of(&registry), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut registry = RecipeRegistry::new();
        registry.register(recipe("go", &[])).unwrap();
        assert_eq!(
            registry.register(recipe("go", &[])),
            Err(RegistryError::Duplicate("go".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let mut registry = RecipeRegistry::new();
        registry.register(recipe("zsh", &["libs"])).unwrap();
        assert_eq!(
            registry.ordered().err(),
            Some(RegistryError::MissingDependency {
                recipe: "zsh".to_string(),
                dependency: "libs".to_string(),
            })
        );
    }

    #[test]
    fn cycle_is_an_error() {
        let mut registry = RecipeRegistry::new();
        registry.register(recipe("a", &["b"])).unwrap();
        registry.register(recipe("b", &["a"])).unwrap();
        registry.register(recipe("c", &[])).unwrap();
        assert_eq!(
            registry.ordered().err(),
            Some(RegistryError::DependencyCycle("a, b".to_string()))
        );
    }

    #[test]
    fn from_table_builds_declarative_recipes() {
        let dir = tempfile::tempdir().unwrap();
        let settings = crate::recipes::test_helpers::settings_in(dir.path());
        let table: RecipeTable = toml::from_str(
            "[zsh]\ncritical = true\ndepends_on = [\"libs\"]\npackages = [\"zsh\"]\n\n[libs]\npackages = [\"git\"]\n",
        )
        .unwrap();
        let registry = RecipeRegistry::from_table(&table, &settings).unwrap();
        assert_eq!(order_of(&registry), vec!["libs", "zsh"]);
        assert!(registry.get("zsh").unwrap().critical());
        assert!(!registry.get("libs").unwrap().critical());
    }
}
