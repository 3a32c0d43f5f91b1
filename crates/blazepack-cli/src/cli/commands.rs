use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::validation::{parse_browser, parse_port};

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the dev server for a project directory
    ///
    /// Reads the project, serves the bundler page, and keeps every connected
    /// browser in sync with the files on disk until interrupted.
    Start(StartArgs),
}

/// Arguments for the start command
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Project directory to serve
    #[arg(default_value = ".", value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Port to listen on
    ///
    /// Overrides `port` from blazepack.config.json and BLAZEPACK_PORT.
    /// Defaults to 3000.
    #[arg(short, long, value_parser = parse_port)]
    pub port: Option<u16>,

    /// Browser to open the dev server in
    ///
    /// Pass an application name to use a specific browser, or `none` to
    /// not open one. Defaults to the system browser.
    ///
    /// Examples:
    ///   blazepack start --browser=firefox
    ///   blazepack start --browser=none
    #[arg(long, value_parser = parse_browser, value_name = "NAME")]
    pub browser: Option<String>,
}
