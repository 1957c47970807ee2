//! Log file location, colour detection and timestamps.
use std::fs;
use std::io::IsTerminal as _;
use std::path::PathBuf;

/// Resolve the devenv state directory from an environment lookup.
///
/// `XDG_STATE_HOME/devenv` when set, else `$HOME/.local/state/devenv`.
fn state_dir_with(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let base = env("XDG_STATE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| env("HOME").map(|h| PathBuf::from(h).join(".local").join("state")))?;
    Some(base.join("devenv"))
}

/// Return the log file path for `command`, creating its directory.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = state_dir_with(|k| std::env::var(k).ok())?.join("logs");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Whether console output should carry ANSI colour.
///
/// Disabled by a non-empty `NO_COLOR` or when stdout is not a terminal.
pub(super) fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none_or(|v| v.is_empty()) && std::io::stdout().is_terminal()
}

/// Current UTC time as RFC 3339 with second precision.
pub(super) fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}
