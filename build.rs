//! Embeds the release version and target triple for `devenv version`.
use std::process::Command;

/// Version reported by `devenv version`: an explicit `DEVENV_VERSION`
/// (release builds), else `git describe` of the checkout.
fn describe_version() -> Option<String> {
    if let Ok(version) = std::env::var("DEVENV_VERSION") {
        return Some(version);
    }
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn main() {
    if let Some(version) = describe_version() {
        println!("cargo:rustc-env=DEVENV_VERSION={version}");
    }
    if let Ok(target) = std::env::var("TARGET") {
        println!("cargo:rustc-env=DEVENV_TARGET={target}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=DEVENV_VERSION");
}
