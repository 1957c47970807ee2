//! `devenv` binary entry point.
use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;

use devenv_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let command = match &args.command {
        cli::Command::Install(_) => "install",
        cli::Command::List => "list",
        cli::Command::Check => "check",
        cli::Command::Completions { .. } | cli::Command::Version => {
            return run_plain(&args.command);
        }
    };
    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(command));

    match &args.command {
        cli::Command::Install(opts) => commands::install::run(&args.global, opts, &log),
        cli::Command::List => commands::list::run(&args.global, log.as_ref()),
        cli::Command::Check => commands::check::run(&args.global, log.as_ref()),
        cli::Command::Completions { .. } | cli::Command::Version => run_plain(&args.command),
    }
}

/// Commands that print to stdout without logging.
fn run_plain(command: &cli::Command) -> Result<()> {
    match command {
        cli::Command::Completions { shell } => {
            let mut cmd = cli::Cli::command();
            generate(*shell, &mut cmd, "devenv", &mut io::stdout());
        }
        cli::Command::Version => commands::version::run(),
        cli::Command::Install(_) | cli::Command::List | cli::Command::Check => {}
    }
    Ok(())
}
