//! Command-line interface definitions.
use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Top-level CLI entry point for the provisioning engine.
#[derive(Parser, Debug)]
#[command(
    name = "devenv",
    about = "Declarative, idempotent development environment provisioning",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(
        short = 'd',
        long = "dry",
        visible_alias = "dry-run",
        env = "DEVENV_DRY_RUN",
        value_parser = clap::builder::BoolishValueParser::new(),
        global = true
    )]
    pub dry_run: bool,

    /// Override the installation root (directory containing conf/)
    #[arg(long, env = "DEVENV_ROOT", global = true)]
    pub root: Option<std::path::PathBuf>,

    /// Disable parallel filesystem steps within recipes (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision the environment
    Install(InstallOpts),
    /// Print the resolved recipe order
    List,
    /// Validate configuration and report warnings
    Check,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print version information
    Version,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// Reinstall packages even when already present
    #[arg(short, long)]
    pub force: bool,

    /// Only run recipes whose name contains this text
    pub filter: Option<String>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::unreachable
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_install_with_filter() {
        let cli = Cli::try_parse_from(["devenv", "install", "zsh"]).unwrap();
        let Command::Install(opts) = cli.command else {
            unreachable!("expected install");
        };
        assert_eq!(opts.filter.as_deref(), Some("zsh"));
        assert!(!opts.force);
    }

    #[test]
    fn parse_install_force() {
        let cli = Cli::try_parse_from(["devenv", "install", "--force"]).unwrap();
        let Command::Install(opts) = cli.command else {
            unreachable!("expected install");
        };
        assert!(opts.force);
        assert_eq!(opts.filter, None);
    }

    #[test]
    fn parse_dry_flag_and_alias() {
        for flag in ["--dry", "--dry-run", "-d"] {
            let cli = Cli::try_parse_from(["devenv", "install", flag]).unwrap();
            assert!(cli.global.dry_run, "{flag} should enable dry run");
        }
    }

    #[test]
    fn parse_root_override() {
        let cli = Cli::try_parse_from(["devenv", "--root", "/tmp/devenv", "list"]).unwrap();
        assert_eq!(cli.global.root, Some(std::path::PathBuf::from("/tmp/devenv")));
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn parallel_is_enabled_by_default() {
        let cli = Cli::try_parse_from(["devenv", "install"]).unwrap();
        assert!(cli.global.parallel, "parallel should be true by default");
    }

    #[test]
    fn no_parallel_disables_parallel() {
        let cli = Cli::try_parse_from(["devenv", "--no-parallel", "install"]).unwrap();
        assert!(!cli.global.parallel);
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::try_parse_from(["devenv", "completions", "zsh"]).unwrap();
        assert!(matches!(cli.command, Command::Completions { shell: Shell::Zsh }));
    }

    #[test]
    fn parse_verbose_and_check() {
        let cli = Cli::try_parse_from(["devenv", "-v", "check"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Check));
    }
}
