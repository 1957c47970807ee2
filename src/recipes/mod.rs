//! Named provisioning units and their registry.
//!
//! A [`Recipe`] is the idempotent "install X, verify X, configure X" unit for
//! one logical tool. Recipes are collected in a [`RecipeRegistry`], which
//! fixes their execution order; the [`Engine`](crate::engine::Engine) runs
//! them.
pub mod context;
pub mod declarative;
pub mod registry;

pub use context::{Context, ExecutionContext};
pub use declarative::DeclarativeRecipe;
pub use registry::RecipeRegistry;

use anyhow::Result;

use crate::installer::InstallResult;
use crate::platform::PlatformInfo;

/// A named, executable provisioning unit.
pub trait Recipe: Send + Sync {
    /// Unique recipe name.
    fn name(&self) -> &str;

    /// Whether a failure aborts the remaining run.
    fn critical(&self) -> bool {
        false
    }

    /// Names of recipes that must run before this one.
    fn depends_on(&self) -> &[String] {
        &[]
    }

    /// Whether this recipe applies to the current platform.
    fn applies_to(&self, _platform: &PlatformInfo) -> bool {
        true
    }

    /// Execute the recipe.
    ///
    /// # Errors
    ///
    /// Returns an error for failures that could not be expressed as an
    /// [`InstallResult`]; the engine treats them as
    /// [`InstallResult::FailedFatal`].
    fn run(&self, ctx: &Context) -> Result<InstallResult>;
}
