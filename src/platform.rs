//! Platform detection: OS, architecture, and available package managers.
use std::fmt;

use crate::exec::Executor;

/// Detected operating system family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Os {
    /// macOS.
    Darwin,
    /// Any Linux distribution.
    Linux,
    /// Anything else; carries the raw kernel name for the error message.
    Other(String),
}

impl Os {
    /// Classify a kernel name as reported by `uname -s` or
    /// [`std::env::consts::OS`].
    #[must_use]
    pub fn from_kernel_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "darwin" | "macos" => Self::Darwin,
            "linux" => Self::Linux,
            _ => Self::Other(name.trim().to_string()),
        }
    }

    /// Whether a recipe `os` tag (e.g. `"darwin"`, `"macos"`, `"linux"`)
    /// refers to this operating system.
    #[must_use]
    pub fn matches_tag(&self, tag: &str) -> bool {
        match (self, tag.to_ascii_lowercase().as_str()) {
            (Self::Darwin, "darwin" | "macos") | (Self::Linux, "linux") => true,
            (Self::Other(name), t) => name.eq_ignore_ascii_case(t),
            _ => false,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Darwin => write!(f, "darwin"),
            Self::Linux => write!(f, "linux"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Normalised CPU architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arch {
    /// `x86_64` / `amd64`.
    X86_64,
    /// `arm64` / `aarch64`.
    Arm64,
    /// Anything else, kept verbatim.
    Other(String),
}

impl Arch {
    /// Classify a machine name as reported by `uname -m` or
    /// [`std::env::consts::ARCH`].
    #[must_use]
    pub fn from_machine(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Self::X86_64,
            "arm64" | "aarch64" | "armv8" | "armv8l" => Self::Arm64,
            _ => Self::Other(name.trim().to_string()),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X86_64 => write!(f, "x86_64"),
            Self::Arm64 => write!(f, "arm64"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Package managers the installer knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageManager {
    /// Homebrew (macOS and Linux).
    Brew,
    /// Debian family (`apt-get`).
    Apt,
    /// Arch Linux.
    Pacman,
    /// Fedora / RHEL 8+.
    Dnf,
    /// Older RHEL / CentOS.
    Yum,
    /// Alpine.
    Apk,
    /// openSUSE.
    Zypper,
}

impl PackageManager {
    /// Every known manager, primary first, then the Linux system managers in
    /// fallback priority order.
    pub const ALL: [Self; 7] = [
        Self::Brew,
        Self::Apt,
        Self::Pacman,
        Self::Dnf,
        Self::Yum,
        Self::Apk,
        Self::Zypper,
    ];

    /// Linux system managers in the order they are tried as fallbacks.
    ///
    /// Some hosts have more than one of these partially installed, so the
    /// order decides which one wins.
    pub const SYSTEM_PRIORITY: [Self; 6] = [
        Self::Apt,
        Self::Pacman,
        Self::Dnf,
        Self::Yum,
        Self::Apk,
        Self::Zypper,
    ];

    /// The executable whose presence on PATH signals this manager.
    #[must_use]
    pub const fn executable(self) -> &'static str {
        match self {
            Self::Brew => "brew",
            Self::Apt => "apt-get",
            Self::Pacman => "pacman",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Apk => "apk",
            Self::Zypper => "zypper",
        }
    }

    /// Parse a manager identifier as used in `package-names.toml`.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "brew" | "homebrew" => Some(Self::Brew),
            "apt" | "apt-get" => Some(Self::Apt),
            "pacman" => Some(Self::Pacman),
            "dnf" => Some(Self::Dnf),
            "yum" => Some(Self::Yum),
            "apk" => Some(Self::Apk),
            "zypper" => Some(Self::Zypper),
            _ => None,
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            Self::Brew => "brew",
            Self::Apt => "apt",
            Self::Pacman => "pacman",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Apk => "apk",
            Self::Zypper => "zypper",
        };
        write!(f, "{id}")
    }
}

/// Capability descriptor for the current host.
///
/// Computed once at start-up by [`PlatformInfo::detect`] and shared
/// read-only with every recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    /// Operating system family.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
    /// Package managers found on PATH at detection time, in [`PackageManager::ALL`] order.
    pub package_managers: Vec<PackageManager>,
    /// Whether the process runs as root (system managers skip `sudo`).
    pub elevated: bool,
}

impl PlatformInfo {
    /// Detect the current platform.
    ///
    /// Uses `uname` for the kernel and machine names, falling back to the
    /// compile-time target when `uname` is unavailable.
    pub fn detect(executor: &dyn Executor) -> Self {
        let os = probe(executor, &["-s"])
            .map_or_else(|| Os::from_kernel_name(std::env::consts::OS), |s| Os::from_kernel_name(&s));
        let arch = probe(executor, &["-m"])
            .map_or_else(|| Arch::from_machine(std::env::consts::ARCH), |s| Arch::from_machine(&s));
        let package_managers = PackageManager::ALL
            .into_iter()
            .filter(|m| executor.which(m.executable()))
            .collect();
        let elevated = executor
            .run_unchecked("id", &["-u"])
            .is_ok_and(|r| r.success && r.stdout.trim() == "0");

        Self {
            os,
            arch,
            package_managers,
            elevated,
        }
    }

    /// Create a platform with explicit values.
    #[must_use]
    pub const fn new(os: Os, arch: Arch, package_managers: Vec<PackageManager>) -> Self {
        Self {
            os,
            arch,
            package_managers,
            elevated: false,
        }
    }

    /// Whether the orchestrator can provision this host at all.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self.os, Os::Darwin | Os::Linux)
    }

    /// Returns `true` on Linux.
    #[must_use]
    pub const fn is_linux(&self) -> bool {
        matches!(self.os, Os::Linux)
    }

    /// Returns `true` on macOS.
    #[must_use]
    pub const fn is_darwin(&self) -> bool {
        matches!(self.os, Os::Darwin)
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let managers: Vec<String> = self
            .package_managers
            .iter()
            .map(ToString::to_string)
            .collect();
        write!(f, "{}/{}", self.os, self.arch)?;
        if managers.is_empty() {
            write!(f, " (no package manager)")
        } else {
            write!(f, " ({})", managers.join(", "))
        }
    }
}

fn probe(executor: &dyn Executor, args: &[&str]) -> Option<String> {
    executor
        .run_unchecked("uname", args)
        .ok()
        .filter(|r| r.success && !r.stdout.trim().is_empty())
        .map(|r| r.stdout.trim().to_string())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::test_helpers::ScriptedExecutor;

    #[test]
    fn kernel_names_are_classified() {
        assert_eq!(Os::from_kernel_name("Darwin"), Os::Darwin);
        assert_eq!(Os::from_kernel_name("Linux\n"), Os::Linux);
        assert_eq!(Os::from_kernel_name("macos"), Os::Darwin);
        assert_eq!(
            Os::from_kernel_name("FreeBSD"),
            Os::Other("FreeBSD".to_string())
        );
    }

    #[test]
    fn machine_names_are_normalised() {
        assert_eq!(Arch::from_machine("x86_64"), Arch::X86_64);
        assert_eq!(Arch::from_machine("amd64"), Arch::X86_64);
        assert_eq!(Arch::from_machine("arm64"), Arch::Arm64);
        assert_eq!(Arch::from_machine("aarch64"), Arch::Arm64);
        assert_eq!(Arch::from_machine("riscv64"), Arch::Other("riscv64".to_string()));
    }

    #[test]
    fn os_tags_match() {
        assert!(Os::Darwin.matches_tag("macos"));
        assert!(Os::Darwin.matches_tag("Darwin"));
        assert!(Os::Linux.matches_tag("linux"));
        assert!(!Os::Linux.matches_tag("darwin"));
    }

    #[test]
    fn unsupported_os_is_detected_but_flagged() {
        let p = PlatformInfo::new(Os::Other("SunOS".into()), Arch::X86_64, vec![]);
        assert!(!p.is_supported());
        assert!(PlatformInfo::new(Os::Linux, Arch::Arm64, vec![]).is_supported());
        assert!(PlatformInfo::new(Os::Darwin, Arch::Arm64, vec![]).is_supported());
    }

    #[test]
    fn manager_ids_round_trip_through_display() {
        for manager in PackageManager::ALL {
            assert_eq!(PackageManager::from_id(&manager.to_string()), Some(manager));
        }
        assert_eq!(PackageManager::from_id("homebrew"), Some(PackageManager::Brew));
        assert_eq!(PackageManager::from_id("nix"), None);
    }

    #[test]
    fn detect_uses_uname_and_path_probes() {
        let exec = ScriptedExecutor::new()
            .succeed("uname -s", "Linux\n")
            .succeed("uname -m", "aarch64\n")
            .succeed("id -u", "1000\n")
            .on_path(&["apt-get", "brew"]);

        let p = PlatformInfo::detect(&exec);
        assert_eq!(p.os, Os::Linux);
        assert_eq!(p.arch, Arch::Arm64);
        assert_eq!(
            p.package_managers,
            vec![PackageManager::Brew, PackageManager::Apt]
        );
        assert!(!p.elevated);
    }

    #[test]
    fn detect_recognises_root() {
        let exec = ScriptedExecutor::new()
            .succeed("uname -s", "Darwin")
            .succeed("uname -m", "arm64")
            .succeed("id -u", "0");

        let p = PlatformInfo::detect(&exec);
        assert!(p.is_darwin());
        assert!(p.elevated);
        assert!(p.package_managers.is_empty());
    }

    #[test]
    fn detect_keeps_unknown_kernel() {
        let exec = ScriptedExecutor::new()
            .succeed("uname -s", "FreeBSD")
            .succeed("uname -m", "amd64");

        let p = PlatformInfo::detect(&exec);
        assert_eq!(p.os, Os::Other("FreeBSD".to_string()));
        assert_eq!(p.arch, Arch::X86_64);
        assert!(!p.is_supported());
    }

    #[test]
    fn detect_falls_back_to_target_when_uname_fails() {
        let exec = ScriptedExecutor::new();

        let p = PlatformInfo::detect(&exec);
        assert_eq!(p.os, Os::from_kernel_name(std::env::consts::OS));
        assert_eq!(p.arch, Arch::from_machine(std::env::consts::ARCH));
    }

    #[test]
    fn display_lists_managers() {
        let p = PlatformInfo::new(
            Os::Linux,
            Arch::X86_64,
            vec![PackageManager::Brew, PackageManager::Pacman],
        );
        assert_eq!(p.to_string(), "linux/x86_64 (brew, pacman)");
        let bare = PlatformInfo::new(Os::Darwin, Arch::Arm64, vec![]);
        assert_eq!(bare.to_string(), "darwin/arm64 (no package manager)");
    }
}
