//! Tracing subscriber: console formatter, log file layer and initialisation.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;

use super::types::Outcome;
use super::utils::{log_file_path, timestamp, use_color};

/// Tracing target for per-recipe stage headers.
pub(super) const STAGE_TARGET: &str = "devenv::stage";
/// Tracing target for completed mutations.
pub(super) const SUCCESS_TARGET: &str = "devenv::success";
/// Tracing target for mutations suppressed by dry-run.
pub(super) const DRY_RUN_TARGET: &str = "devenv::dry_run";
/// Tracing target for run summary lines; carries an `outcome` field.
pub(super) const SUMMARY_TARGET: &str = "devenv::summary";

/// Environment variable holding an [`EnvFilter`](tracing_subscriber::EnvFilter)
/// directive for the console.
pub const LOG_ENV: &str = "DEVENV_LOG";

/// The message of a [`tracing::Event`] and its remaining fields.
#[derive(Debug, Default)]
struct EventFields {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl EventFields {
    fn of(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Message followed by ` key=value` for every field not in `skip`.
    fn render(&self, skip: &[&str]) -> String {
        let mut out = self.message.clone();
        for (k, v) in self.fields.iter().filter(|(k, _)| !skip.contains(k)) {
            out.push(' ');
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out
    }
}

impl tracing::field::Visit for EventFields {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }
}

/// Short tag for an event, shared by the console and file outputs.
fn tag(level: Level, target: &str) -> &'static str {
    match (level, target) {
        (Level::INFO, STAGE_TARGET) => "stage",
        (Level::INFO, SUCCESS_TARGET) => "success",
        (Level::INFO, DRY_RUN_TARGET) => "dry",
        (Level::INFO, SUMMARY_TARGET) => "summary",
        (Level::ERROR, _) => "error",
        (Level::WARN, _) => "warn",
        (Level::INFO, _) => "info",
        _ => "debug",
    }
}

/// A [`tracing_subscriber::Layer`] appending every event to the run log
/// as `<timestamp> [<tag>] <message> key=value...`.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Open the log file for `command` under the state directory.
    pub(super) fn new(command: &str) -> Option<Self> {
        Self::at(&log_file_path(command)?)
    }

    /// Truncate `path`, write a run header, and append subsequent events.
    pub(super) fn at(path: &Path) -> Option<Self> {
        let version =
            option_env!("DEVENV_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        fs::write(path, format!("# devenv {version} started {}\n", timestamp())).ok()?;
        let file = fs::OpenOptions::new().append(true).open(path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let meta = event.metadata();
        let fields = EventFields::of(event);
        let line = format!(
            "{} [{}] {}",
            timestamp(),
            tag(*meta.level(), meta.target()),
            fields.render(&[])
        );
        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "{line}").ok();
        }
    }
}

/// Console formatter producing one leveled line per event.
struct ConsoleFormatter {
    color: bool,
}

impl ConsoleFormatter {
    fn paint(&self, sgr: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{sgr}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    const fn outcome_sgr(outcome: Option<Outcome>) -> &'static str {
        match outcome {
            Some(Outcome::Changed) => "32",
            Some(Outcome::DryRun) => "35",
            Some(Outcome::Failed) => "31",
            Some(_) => "2",
            None => "1",
        }
    }
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let fields = EventFields::of(event);

        match tag(*meta.level(), meta.target()) {
            "stage" => writeln!(
                writer,
                "{} {}",
                self.paint("1;34", "==>"),
                self.paint("1", &fields.render(&[]))
            ),
            "summary" => {
                let outcome = fields.get("outcome").and_then(Outcome::from_label);
                writeln!(
                    writer,
                    "{}",
                    self.paint(Self::outcome_sgr(outcome), &fields.render(&["outcome"]))
                )
            }
            other => {
                let sgr = match other {
                    "error" => "31",
                    "warn" => "33",
                    "success" => "32",
                    "dry" => "35",
                    "info" => "36",
                    _ => "2",
                };
                let label = format!("{:<8}", other.to_uppercase());
                writeln!(writer, "{}{}", self.paint(sgr, &label), fields.render(&[]))
            }
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Warnings and errors go to stderr, everything else to stdout. The console
/// level is `debug` when `verbose`, else taken from [`LOG_ENV`] (default
/// `info`). The file layer always records `debug` and above.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter { color: use_color() })
        .with_writer(make_writer)
        .with_filter(console_filter);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
