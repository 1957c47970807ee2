//! Sequential recipe execution with the critical/non-critical failure policy.
use std::fmt;

use crate::error::ProvisionError;
use crate::installer::InstallResult;
use crate::logging::Outcome;
use crate::recipes::{Context, RecipeRegistry};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    /// Nothing executed yet.
    #[default]
    NotStarted,
    /// Recipes are executing.
    Running,
    /// Every selected recipe ran.
    Completed,
    /// A critical recipe failed; later recipes were not attempted.
    AbortedOnCriticalFailure,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::AbortedOnCriticalFailure => write!(f, "aborted on critical failure"),
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Final state.
    pub state: RunState,
    /// Executed recipes in order, truncated at the abort point.
    pub results: Vec<(String, InstallResult)>,
    /// Recipes excluded by the name filter.
    pub filtered: Vec<String>,
    /// Recipes restricted to another OS.
    pub not_applicable: Vec<String>,
}

impl RunReport {
    /// Whether a critical failure aborted the run.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.state == RunState::AbortedOnCriticalFailure
    }

    /// The failed critical recipe and its reason, if the run aborted.
    #[must_use]
    pub fn abort_cause(&self) -> Option<(&str, &str)> {
        if !self.aborted() {
            return None;
        }
        self.results
            .last()
            .and_then(|(name, result)| result.reason().map(|r| (name.as_str(), r)))
    }

    /// Number of failed recipes.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_failure()).count()
    }
}

/// Runs the recipes of a registry in their resolved order.
#[derive(Debug)]
pub struct Engine<'a> {
    registry: &'a RecipeRegistry,
}

impl<'a> Engine<'a> {
    /// An engine over `registry`.
    #[must_use]
    pub const fn new(registry: &'a RecipeRegistry) -> Self {
        Self { registry }
    }

    /// Execute every selected recipe.
    ///
    /// Recipes run strictly one after another. A failed critical recipe
    /// stops the run; a failed non-critical one is logged and the run
    /// continues. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::PlatformUnsupported`] before executing
    /// anything when the OS is neither Darwin nor Linux, and
    /// [`ProvisionError::Registry`] if no execution order exists.
    pub fn run(&self, ctx: &Context) -> Result<RunReport, ProvisionError> {
        if !ctx.platform.is_supported() {
            return Err(ProvisionError::PlatformUnsupported {
                os: ctx.platform.os.to_string(),
            });
        }

        let order = self.registry.ordered()?;
        let mut report = RunReport {
            state: RunState::Running,
            ..RunReport::default()
        };

        for recipe in order {
            let name = recipe.name();

            if !ctx.options.selects(name) {
                ctx.log.info(&format!("{name}: filtered"));
                ctx.log.record(name, Outcome::Filtered, None);
                report.filtered.push(name.to_string());
                continue;
            }

            if !recipe.applies_to(&ctx.platform) {
                ctx.log
                    .debug(&format!("skipping recipe: {name} (not applicable on {})", ctx.platform.os));
                ctx.log.record(name, Outcome::NotApplicable, None);
                report.not_applicable.push(name.to_string());
                continue;
            }

            ctx.log.stage(name);
            let result = recipe
                .run(ctx)
                .unwrap_or_else(|e| InstallResult::FailedFatal(format!("{e:#}")));

            let (outcome, detail) = match &result {
                InstallResult::Success if ctx.options.dry_run => (Outcome::DryRun, None),
                InstallResult::Success => (Outcome::Changed, None),
                InstallResult::SkippedAlreadyInstalled => (Outcome::Unchanged, None),
                InstallResult::FailedFallbackExhausted(reason) | InstallResult::FailedFatal(reason) => {
                    (Outcome::Failed, Some(reason.as_str()))
                }
            };
            ctx.log.record(name, outcome, detail);

            let failure = result.reason().map(str::to_string);
            report.results.push((name.to_string(), result));

            if let Some(reason) = failure {
                if recipe.critical() {
                    ctx.log.error(
                        &ProvisionError::CriticalRecipeFailed {
                            recipe: name.to_string(),
                            reason,
                        }
                        .to_string(),
                    );
                    report.state = RunState::AbortedOnCriticalFailure;
                    return Ok(report);
                }
                ctx.log.warn(
                    &ProvisionError::NonCriticalRecipeFailed {
                        recipe: name.to_string(),
                        reason,
                    }
                    .to_string(),
                );
            }
        }

        report.state = RunState::Completed;
        Ok(report)
    }
}
