//! Recipe outcome records and the [`Log`] trait.
use std::fmt;

/// How a recipe ended, as shown in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The recipe changed the system.
    Changed,
    /// Everything the recipe declares was already in place.
    Unchanged,
    /// The recipe name did not match the run filter.
    Filtered,
    /// The recipe is restricted to another operating system.
    NotApplicable,
    /// The recipe would have changed the system outside dry-run mode.
    DryRun,
    /// The recipe failed.
    Failed,
}

impl Outcome {
    /// Short lowercase label used in structured fields and totals.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
            Self::Filtered => "filtered",
            Self::NotApplicable => "n/a",
            Self::DryRun => "dry-run",
            Self::Failed => "failed",
        }
    }

    /// Single-character marker printed before the recipe name.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Changed => '✓',
            Self::Unchanged => '=',
            Self::Filtered | Self::NotApplicable => '·',
            Self::DryRun => '~',
            Self::Failed => '✗',
        }
    }

    /// Parse a [`label`](Self::label) back into an outcome.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        [
            Self::Changed,
            Self::Unchanged,
            Self::Filtered,
            Self::NotApplicable,
            Self::DryRun,
            Self::Failed,
        ]
        .into_iter()
        .find(|o| o.label() == label)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One recipe's entry in the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRecord {
    /// Recipe name.
    pub name: String,
    /// How the recipe ended.
    pub outcome: Outcome,
    /// Failure reason or other detail.
    pub detail: Option<String>,
}

/// Per-outcome counts over a set of [`RecipeRecord`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// [`Outcome::Changed`] count.
    pub changed: usize,
    /// [`Outcome::Unchanged`] count.
    pub unchanged: usize,
    /// [`Outcome::Filtered`] count.
    pub filtered: usize,
    /// [`Outcome::NotApplicable`] count.
    pub not_applicable: usize,
    /// [`Outcome::DryRun`] count.
    pub dry_run: usize,
    /// [`Outcome::Failed`] count.
    pub failed: usize,
}

impl Tally {
    /// Count `records` by outcome.
    #[must_use]
    pub fn of(records: &[RecipeRecord]) -> Self {
        let mut tally = Self::default();
        for record in records {
            let slot = match record.outcome {
                Outcome::Changed => &mut tally.changed,
                Outcome::Unchanged => &mut tally.unchanged,
                Outcome::Filtered => &mut tally.filtered,
                Outcome::NotApplicable => &mut tally.not_applicable,
                Outcome::DryRun => &mut tally.dry_run,
                Outcome::Failed => &mut tally.failed,
            };
            *slot += 1;
        }
        tally
    }

    /// Number of records counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.changed
            + self.unchanged
            + self.filtered
            + self.not_applicable
            + self.dry_run
            + self.failed
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} recipes: {} changed, {} unchanged, {} filtered, {} n/a, {} dry-run, {} failed",
            self.total(),
            self.changed,
            self.unchanged,
            self.filtered,
            self.not_applicable,
            self.dry_run,
            self.failed
        )
    }
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) is the production implementation; tests
/// substitute an in-memory recorder so they can assert on emitted lines.
pub trait Log: Send + Sync {
    /// Log a stage header (one per recipe).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a completed mutation.
    fn success(&self, msg: &str);
    /// Log a debug message (console only when verbose).
    fn debug(&self, msg: &str);
    /// Log a warning.
    fn warn(&self, msg: &str);
    /// Log an error.
    fn error(&self, msg: &str);
    /// Log a mutation that dry-run mode suppressed.
    fn dry_run(&self, msg: &str);
    /// Record a recipe outcome for the summary.
    fn record(&self, name: &str, outcome: Outcome, detail: Option<&str>);
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn record(name: &str, outcome: Outcome) -> RecipeRecord {
        RecipeRecord {
            name: name.to_string(),
            outcome,
            detail: None,
        }
    }

    #[test]
    fn labels_round_trip() {
        for outcome in [
            Outcome::Changed,
            Outcome::Unchanged,
            Outcome::Filtered,
            Outcome::NotApplicable,
            Outcome::DryRun,
            Outcome::Failed,
        ] {
            assert_eq!(Outcome::from_label(outcome.label()), Some(outcome));
        }
        assert_eq!(Outcome::from_label("exploded"), None);
    }

    #[test]
    fn tally_counts_each_outcome() {
        let tally = Tally::of(&[
            record("libs", Outcome::Changed),
            record("zsh", Outcome::Unchanged),
            record("go", Outcome::Failed),
            record("fonts", Outcome::Failed),
            record("mas", Outcome::NotApplicable),
        ]);
        assert_eq!(tally.changed, 1);
        assert_eq!(tally.failed, 2);
        assert_eq!(tally.total(), 5);
        assert_eq!(
            tally.to_string(),
            "5 recipes: 1 changed, 1 unchanged, 0 filtered, 1 n/a, 0 dry-run, 2 failed"
        );
    }

    #[test]
    fn empty_tally() {
        assert_eq!(Tally::of(&[]), Tally::default());
        assert_eq!(Tally::default().total(), 0);
    }
}
