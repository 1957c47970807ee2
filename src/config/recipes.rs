//! `recipes.toml` data model.
//!
//! One top-level table per recipe:
//!
//! ```toml
//! [zsh]
//! critical = true
//! depends_on = ["libs"]
//! packages = ["zsh", { name = "starship", fallback = ["curl -sS https://starship.rs/install.sh | sh -s -- -y"] }]
//! symlinks = [{ source = "dotfiles/zshrc", target = "~/.zshrc" }]
//! lines = [{ file = "~/.profile", line = "export EDITOR=nvim" }]
//! ```
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::toml_loader::load_config;
use crate::error::ConfigError;

/// All recipes keyed by name (sorted).
pub type RecipeTable = BTreeMap<String, RecipeSpec>;

/// One recipe as written in `recipes.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeSpec {
    /// Failure aborts the whole run.
    #[serde(default)]
    pub critical: bool,
    /// Recipes that must run first.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Restrict to these OS tags (`darwin`/`macos`, `linux`); empty means any.
    #[serde(default)]
    pub os: Vec<String>,
    /// Packages to install, in order.
    #[serde(default)]
    pub packages: Vec<PackageSpec>,
    /// Directories to create.
    #[serde(default)]
    pub directories: Vec<String>,
    /// Files with exact content.
    #[serde(default)]
    pub files: Vec<FileSpec>,
    /// Lines that must be present in files.
    #[serde(default)]
    pub lines: Vec<LineSpec>,
    /// Symlinks to place.
    #[serde(default)]
    pub symlinks: Vec<LinkSpec>,
    /// Directory trees to copy.
    #[serde(default)]
    pub trees: Vec<LinkSpec>,
    /// Shell commands run after everything else.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

impl RecipeSpec {
    /// Whether the recipe declares no work at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.packages.is_empty()
            && self.directories.is_empty()
            && self.files.is_empty()
            && self.lines.is_empty()
            && self.symlinks.is_empty()
            && self.trees.is_empty()
            && self.commands.is_empty()
    }
}

/// A package entry: a bare name or a table with overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PackageSpec {
    /// Logical name only.
    Name(String),
    /// Name with presence probe and custom fallbacks.
    Detailed {
        /// Logical name.
        name: String,
        /// Executable proving the package is installed.
        #[serde(default)]
        bin: Option<String>,
        /// Shell snippets tried after every package manager.
        #[serde(default)]
        fallback: Vec<String>,
    },
}

impl PackageSpec {
    /// Logical package name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }
}

/// A file with content given inline or copied from a source file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSpec {
    /// Destination path.
    pub target: String,
    /// Inline content.
    #[serde(default)]
    pub content: Option<String>,
    /// Source file whose content is used.
    #[serde(default)]
    pub source: Option<String>,
}

/// A line that must appear in a file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineSpec {
    /// File to edit.
    pub file: String,
    /// Line content.
    pub line: String,
}

/// A source/target pair (symlinks and trees).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSpec {
    /// Source path, relative to the root unless absolute.
    pub source: String,
    /// Destination path.
    pub target: String,
}

/// A shell command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    /// Shell snippet passed to `sh -c`.
    pub run: String,
    /// Working directory.
    #[serde(default)]
    pub dir: Option<String>,
    /// Skip the command when this path exists.
    #[serde(default)]
    pub creates: Option<String>,
}

/// Load `recipes.toml`; a missing file yields no recipes.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(path: &Path) -> Result<RecipeTable, ConfigError> {
    load_config(path)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn parse(content: &str) -> RecipeTable {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.toml");
        std::fs::write(&path, content).unwrap();
        load(&path).unwrap()
    }

    #[test]
    fn parses_full_recipe() {
        let recipes = parse(
            r#"
[zsh]
critical = true
depends_on = ["libs"]
os = ["linux"]
packages = ["zsh", { name = "starship", bin = "starship", fallback = ["curl -sS x | sh"] }]
directories = ["~/.cache/zsh"]
files = [{ target = "~/.hushlogin", content = "" }]
lines = [{ file = "~/.profile", line = "export SHELL=zsh" }]
symlinks = [{ source = "dotfiles/zshrc", target = "~/.zshrc" }]
trees = [{ source = "dotfiles/zsh", target = "~/.config/zsh" }]
commands = [{ run = "chsh -s /bin/zsh", creates = "~/.zsh_done" }]

[libs]
packages = ["git"]
"#,
        );

        let names: Vec<_> = recipes.keys().cloned().collect();
        assert_eq!(names, vec!["libs", "zsh"]);

        let zsh = &recipes["zsh"];
        assert!(zsh.critical);
        assert_eq!(zsh.depends_on, vec!["libs"]);
        assert_eq!(zsh.packages[0], PackageSpec::Name("zsh".to_string()));
        assert_eq!(zsh.packages[1].name(), "starship");
        assert!(matches!(
            &zsh.packages[1],
            PackageSpec::Detailed { fallback, .. } if fallback.len() == 1
        ));
        assert_eq!(zsh.commands[0].creates.as_deref(), Some("~/.zsh_done"));
        assert!(!recipes["libs"].critical);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.toml");
        std::fs::write(&path, "[go]\ncritcal = true\n").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn empty_recipe_detected() {
        let recipes = parse("[placeholder]\ncritical = false\n");
        assert!(recipes["placeholder"].is_empty());
    }
}
