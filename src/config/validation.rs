//! Non-fatal checks over loaded recipe configuration.
use std::fmt;

use super::Settings;
use super::recipes::{PackageSpec, RecipeTable};

/// Source name for warnings about `recipes.toml`.
const RECIPES: &str = "recipes.toml";

/// OS tags a recipe may restrict itself to.
const KNOWN_OS_TAGS: &[&str] = &["darwin", "macos", "linux"];

/// A non-fatal problem found in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// File the problem was found in, e.g. `recipes.toml`.
    pub source: &'static str,
    /// Recipe or logical package name the problem belongs to.
    pub item: String,
    /// What is wrong.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning about `item` in `source`.
    #[must_use]
    pub fn new(source: &'static str, item: &str, message: impl Into<String>) -> Self {
        Self {
            source,
            item: item.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.item, self.message)
    }
}

/// One family of checks over the recipe table.
pub trait ConfigValidator {
    /// Return every problem this validator finds.
    fn validate(&self, settings: &Settings) -> Vec<ValidationWarning>;
}

/// Run every recipe validator.
#[must_use]
pub fn validate(recipes: &RecipeTable, settings: &Settings) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 3] = [
        &StructureValidator::new(recipes),
        &DependencyValidator::new(recipes),
        &PathValidator::new(recipes),
    ];
    validators.iter().flat_map(|v| v.validate(settings)).collect()
}

/// Empty recipes, unknown OS tags, malformed entries.
#[derive(Debug)]
pub struct StructureValidator<'a> {
    recipes: &'a RecipeTable,
}

impl<'a> StructureValidator<'a> {
    /// Create a validator over `recipes`.
    #[must_use]
    pub const fn new(recipes: &'a RecipeTable) -> Self {
        Self { recipes }
    }
}

impl ConfigValidator for StructureValidator<'_> {
    fn validate(&self, _settings: &Settings) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (name, recipe) in self.recipes {
            if recipe.is_empty() {
                warnings.push(ValidationWarning::new(RECIPES, name, "recipe declares no work"));
            }

            for tag in &recipe.os {
                if !KNOWN_OS_TAGS.contains(&tag.to_ascii_lowercase().as_str()) {
                    warnings.push(ValidationWarning::new(
                        RECIPES,
                        name,
                        format!("unknown os tag '{tag}'; recipe will never run"),
                    ));
                }
            }

            for package in &recipe.packages {
                if package.name().trim().is_empty() {
                    warnings.push(ValidationWarning::new(RECIPES, name, "package name is empty"));
                }
                if let PackageSpec::Detailed { fallback, .. } = package
                    && fallback.iter().any(|f| f.trim().is_empty())
                {
                    warnings.push(ValidationWarning::new(
                        RECIPES,
                        name,
                        format!("empty fallback command for package '{}'", package.name()),
                    ));
                }
            }

            for file in &recipe.files {
                match (&file.content, &file.source) {
                    (Some(_), Some(_)) => warnings.push(ValidationWarning::new(
                        RECIPES,
                        name,
                        format!("file '{}' sets both content and source", file.target),
                    )),
                    (None, None) => warnings.push(ValidationWarning::new(
                        RECIPES,
                        name,
                        format!("file '{}' sets neither content nor source", file.target),
                    )),
                    _ => {}
                }
            }
        }

        warnings
    }
}

/// `depends_on` entries naming unknown recipes or the recipe itself.
#[derive(Debug)]
pub struct DependencyValidator<'a> {
    recipes: &'a RecipeTable,
}

impl<'a> DependencyValidator<'a> {
    /// Create a validator over `recipes`.
    #[must_use]
    pub const fn new(recipes: &'a RecipeTable) -> Self {
        Self { recipes }
    }
}

impl ConfigValidator for DependencyValidator<'_> {
    fn validate(&self, _settings: &Settings) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (name, recipe) in self.recipes {
            for dep in &recipe.depends_on {
                if dep == name {
                    warnings.push(ValidationWarning::new(RECIPES, name, "recipe depends on itself"));
                } else if !self.recipes.contains_key(dep) {
                    warnings.push(ValidationWarning::new(
                        RECIPES,
                        name,
                        format!("depends on unknown recipe '{dep}'"),
                    ));
                }
            }
        }

        warnings
    }
}

/// Unexpandable paths and sources that do not exist.
#[derive(Debug)]
pub struct PathValidator<'a> {
    recipes: &'a RecipeTable,
}

impl<'a> PathValidator<'a> {
    /// Create a validator over `recipes`.
    #[must_use]
    pub const fn new(recipes: &'a RecipeTable) -> Self {
        Self { recipes }
    }
}

impl ConfigValidator for PathValidator<'_> {
    fn validate(&self, settings: &Settings) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (name, recipe) in self.recipes {
            let sources = recipe
                .symlinks
                .iter()
                .chain(&recipe.trees)
                .map(|l| l.source.as_str())
                .chain(recipe.files.iter().filter_map(|f| f.source.as_deref()));

            for raw in sources {
                match settings.expand_source(raw) {
                    Ok(path) if !path.exists() => warnings.push(ValidationWarning::new(
                        RECIPES,
                        name,
                        format!("source does not exist: {}", path.display()),
                    )),
                    Ok(_) => {}
                    Err(e) => warnings.push(ValidationWarning::new(RECIPES, name, e.to_string())),
                }
            }

            let targets = recipe
                .symlinks
                .iter()
                .chain(&recipe.trees)
                .map(|l| l.target.as_str())
                .chain(recipe.files.iter().map(|f| f.target.as_str()))
                .chain(recipe.lines.iter().map(|l| l.file.as_str()))
                .chain(recipe.directories.iter().map(String::as_str))
                .chain(recipe.commands.iter().filter_map(|c| c.dir.as_deref()))
                .chain(recipe.commands.iter().filter_map(|c| c.creates.as_deref()));

            for raw in targets {
                if let Err(e) = settings.expand_target(raw) {
                    warnings.push(ValidationWarning::new(RECIPES, name, e.to_string()));
                }
            }
        }

        warnings
    }
}
