//! # Quoteline CLI Application
//!
//! Terminal front end for the quote engine: edit lines and project
//! fields, print the top sheet, and manage saved quotes.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod logging;
mod report;

use crate::cli::{Cli, LogFormatArg};
use crate::commands::{resolve_store_dir, today, Workspace};
use crate::logging::{init_logging, LogConfig, LogFormat};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<()> {
    let today = today();
    let store = resolve_store_dir(cli.store)?;
    let mut workspace = Workspace::open(&store, today)?;
    workspace.run(cli.command, today)
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    LogConfig::from_verbosity(cli.verbose).with_format(format)
}
