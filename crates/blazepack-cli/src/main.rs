//! Blazepack CLI entry point.
//!
//! Parses arguments, initializes logging and colors, and dispatches commands.

use blazepack_cli::{cli, commands, error, logger, ui};
use clap::Parser;
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);
    ui::set_verbose(args.verbose);

    let result = match args.command {
        cli::Command::Start(start_args) => {
            commands::start_execute(start_args, args.verbose).await
        }
    };

    result.map_err(error::cli_error_to_miette)
}
