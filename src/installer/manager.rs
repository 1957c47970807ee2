//! Command lines for each package manager.
use crate::platform::PackageManager;

/// A program with its arguments, ready to hand to an
/// [`Executor`](crate::exec::Executor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program to execute.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

impl CommandLine {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    /// Prefix the command with `sudo`.
    #[must_use]
    pub fn with_sudo(self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
        }
    }

    /// Arguments as string slices.
    #[must_use]
    pub fn arg_refs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl PackageManager {
    /// Whether installs through this manager modify system directories.
    #[must_use]
    pub const fn needs_privilege(self) -> bool {
        !matches!(self, Self::Brew)
    }

    /// Command that installs `name`, or reinstalls it when `reinstall` is set.
    ///
    /// System managers are wrapped in `sudo` unless `elevated`; Homebrew
    /// refuses to run as root and is never wrapped.
    #[must_use]
    pub fn install_command(self, name: &str, reinstall: bool, elevated: bool) -> CommandLine {
        let cmd = match (self, reinstall) {
            (Self::Brew, false) => CommandLine::new("brew", &["install", name]),
            (Self::Brew, true) => CommandLine::new("brew", &["reinstall", name]),
            (Self::Apt, false) => CommandLine::new("apt-get", &["install", "-y", name]),
            (Self::Apt, true) => {
                CommandLine::new("apt-get", &["install", "--reinstall", "-y", name])
            }
            (Self::Pacman, false) => {
                CommandLine::new("pacman", &["-S", "--needed", "--noconfirm", name])
            }
            (Self::Pacman, true) => CommandLine::new("pacman", &["-S", "--noconfirm", name]),
            (Self::Dnf, false) => CommandLine::new("dnf", &["install", "-y", name]),
            (Self::Dnf, true) => CommandLine::new("dnf", &["reinstall", "-y", name]),
            (Self::Yum, false) => CommandLine::new("yum", &["install", "-y", name]),
            (Self::Yum, true) => CommandLine::new("yum", &["reinstall", "-y", name]),
            (Self::Apk, false) => CommandLine::new("apk", &["add", name]),
            (Self::Apk, true) => CommandLine::new("apk", &["fix", name]),
            (Self::Zypper, false) => {
                CommandLine::new("zypper", &["--non-interactive", "install", name])
            }
            (Self::Zypper, true) => {
                CommandLine::new("zypper", &["--non-interactive", "install", "--force", name])
            }
        };
        if self.needs_privilege() && !elevated {
            cmd.with_sudo()
        } else {
            cmd
        }
    }

    /// Read-only command that exits zero when `name` is installed.
    #[must_use]
    pub fn query_command(self, name: &str) -> CommandLine {
        match self {
            Self::Brew => CommandLine::new("brew", &["list", "--versions", name]),
            Self::Apt => CommandLine::new("dpkg", &["-s", name]),
            Self::Pacman => CommandLine::new("pacman", &["-Q", name]),
            Self::Dnf | Self::Yum | Self::Zypper => CommandLine::new("rpm", &["-q", name]),
            Self::Apk => CommandLine::new("apk", &["info", "-e", name]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brew_never_uses_sudo() {
        let cmd = PackageManager::Brew.install_command("go", false, false);
        assert_eq!(cmd.to_string(), "brew install go");
        let cmd = PackageManager::Brew.install_command("go", true, true);
        assert_eq!(cmd.to_string(), "brew reinstall go");
    }

    #[test]
    fn system_managers_use_sudo_unless_elevated() {
        let cmd = PackageManager::Apt.install_command("zsh", false, false);
        assert_eq!(cmd.to_string(), "sudo apt-get install -y zsh");
        let cmd = PackageManager::Apt.install_command("zsh", false, true);
        assert_eq!(cmd.to_string(), "apt-get install -y zsh");
    }

    #[test]
    fn reinstall_forms() {
        assert_eq!(
            PackageManager::Pacman
                .install_command("git", true, true)
                .to_string(),
            "pacman -S --noconfirm git"
        );
        assert_eq!(
            PackageManager::Dnf.install_command("git", true, true).to_string(),
            "dnf reinstall -y git"
        );
        assert_eq!(
            PackageManager::Zypper
                .install_command("git", true, false)
                .to_string(),
            "sudo zypper --non-interactive install --force git"
        );
    }

    #[test]
    fn query_commands() {
        assert_eq!(
            PackageManager::Brew.query_command("jq").to_string(),
            "brew list --versions jq"
        );
        assert_eq!(PackageManager::Yum.query_command("jq").to_string(), "rpm -q jq");
        assert_eq!(
            PackageManager::Apk.query_command("jq").arg_refs(),
            vec!["info", "-e", "jq"]
        );
    }
}
