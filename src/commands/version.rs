//! Command: print version information.

/// Version string embedded at build time, falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("DEVENV_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// `devenv <version>`, with the build target triple when known.
#[must_use]
pub fn long_version() -> String {
    option_env!("DEVENV_TARGET").map_or_else(
        || format!("devenv {}", version()),
        |target| format!("devenv {} ({target})", version()),
    )
}

/// Print the devenv version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("{}", long_version());
}
