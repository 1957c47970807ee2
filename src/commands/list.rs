//! Command: print the resolved recipe order.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::exec::SystemExecutor;
use crate::logging::Log;
use crate::platform::PlatformInfo;
use crate::recipes::RecipeRegistry;

use super::CommandSetup;

/// Run the list command: print recipes in execution order.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or the recipe graph
/// has no valid order.
#[allow(clippy::print_stdout)] // the order is the command's output
pub fn run(global: &GlobalOpts, log: &dyn Log) -> Result<()> {
    let settings = Settings::resolve(global.root.as_deref())?;
    let setup = CommandSetup::init(settings, log, &SystemExecutor)?;

    log.stage("Execution order");
    for line in format_order(&setup.registry, &setup.platform)? {
        println!("{line}");
    }
    Ok(())
}

/// One line per recipe: position, name, and markers for criticality and
/// platform applicability.
///
/// # Errors
///
/// Returns an error if the recipe graph has no valid order.
pub fn format_order(registry: &RecipeRegistry, platform: &PlatformInfo) -> Result<Vec<String>> {
    let order = registry.ordered()?;
    Ok(order
        .iter()
        .enumerate()
        .map(|(i, recipe)| {
            let mut markers = Vec::new();
            if recipe.critical() {
                markers.push("critical");
            }
            if !recipe.applies_to(platform) {
                markers.push("n/a");
            }
            let suffix = if markers.is_empty() {
                String::new()
            } else {
                format!(" ({})", markers.join(", "))
            };
            format!("{}. {}{suffix}", i + 1, recipe.name())
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::recipes::RecipeTable;
    use crate::platform::{Arch, Os};
    use crate::recipes::test_helpers::settings_in;

    #[test]
    fn order_lines_mark_critical_and_foreign_recipes() {
        let dir = tempfile::tempdir().unwrap();
        let table: RecipeTable = toml::from_str(
            r#"
[zsh]
critical = true
depends_on = ["libs"]
packages = ["zsh"]

[libs]
critical = true
packages = ["git"]

[mas]
os = ["darwin"]
packages = ["mas"]
"#,
        )
        .unwrap();
        let registry = RecipeRegistry::from_table(&table, &settings_in(dir.path())).unwrap();
        let linux = PlatformInfo::new(Os::Linux, Arch::X86_64, vec![]);

        insta::assert_snapshot!(format_order(&registry, &linux).unwrap().join("\n"), @r"
        1. libs (critical)
        2. mas (n/a)
        3. zsh (critical)
        ");
    }
}
