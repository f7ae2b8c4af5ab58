//! `hosttune` command-line entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use hosttune::cli::{Cli, Command};
use hosttune::{commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    let command_name = match &args.command {
        Command::List => "list",
        Command::Status(_) => "status",
        Command::Apply(_) => "apply",
        Command::Restore(_) => "restore",
        Command::Optimize(_) => "optimize",
        Command::Deploy(_) => "deploy",
        Command::Version => "version",
    };
    logging::init_subscriber(args.verbose, command_name);
    let log = Arc::new(logging::Logger::new(command_name));

    match args.command {
        Command::List => {
            commands::list::run();
            Ok(())
        }
        Command::Status(opts) => commands::status::run(&args.global, &opts, &log),
        Command::Apply(opts) => commands::apply::run(&args.global, &opts, &log),
        Command::Restore(opts) => commands::restore::run(&args.global, &opts, &log),
        Command::Optimize(opts) => commands::optimize::run(&args.global, &opts, &log),
        Command::Deploy(opts) => commands::deploy::run(&opts, &log),
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
