//! Console logger that collects recipe outcomes for the run summary.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET, SUCCESS_TARGET, SUMMARY_TARGET};
use super::types::{Log, Outcome, RecipeRecord, Tally};
use super::utils::log_file_path;

/// Production [`Log`] implementation.
///
/// Messages are emitted as [`tracing`] events; the subscriber installed by
/// [`init_subscriber`](super::init_subscriber) renders them to the console
/// and appends them to `$XDG_STATE_HOME/devenv/logs/<command>.log`.
#[derive(Debug)]
pub struct Logger {
    records: Mutex<Vec<RecipeRecord>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger for `command`, reporting its log file in the summary.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Create a logger that reports `log_file` in its summary.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Path of the run log, if one could be opened.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Recorded outcomes in recording order.
    #[must_use]
    pub fn records(&self) -> Vec<RecipeRecord> {
        self.records.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Per-outcome counts of the recorded recipes.
    #[must_use]
    pub fn tally(&self) -> Tally {
        self.records
            .lock()
            .map_or_else(|_| Tally::default(), |g| Tally::of(&g))
    }

    /// Number of recipes recorded as [`Outcome::Failed`].
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tally().failed
    }

    /// Emit one summary line per recorded recipe followed by the totals.
    pub fn print_summary(&self) {
        let records = self.records();
        if records.is_empty() {
            return;
        }

        self.stage("Summary");
        for record in &records {
            let detail = record
                .detail
                .as_ref()
                .map_or_else(String::new, |d| format!(" ({d})"));
            tracing::info!(
                target: SUMMARY_TARGET,
                outcome = record.outcome.label(),
                "{} {}{detail}",
                record.outcome.marker(),
                record.name
            );
        }
        tracing::info!(target: SUMMARY_TARGET, "{}", Tally::of(&records));

        if let Some(path) = &self.log_file {
            tracing::info!(target: SUMMARY_TARGET, outcome = "unchanged", "log: {}", path.display());
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn success(&self, msg: &str) {
        tracing::info!(target: SUCCESS_TARGET, "{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    fn record(&self, name: &str, outcome: Outcome, detail: Option<&str>) {
        tracing::debug!(recipe = name, outcome = outcome.label(), "recorded outcome");
        if let Ok(mut records) = self.records.lock() {
            records.push(RecipeRecord {
                name: name.to_string(),
                outcome,
                detail: detail.map(String::from),
            });
        }
    }
}
