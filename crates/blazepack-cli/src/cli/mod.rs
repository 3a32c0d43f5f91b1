//! Command-line interface definition.
//!
//! # Command Structure
//!
//! - `blazepack start [DIRECTORY]` - Serve a project to the in-browser bundler
//!   and push file changes to every open page

mod commands;
mod validation;

use clap::Parser;

pub use commands::{Command, StartArgs};
pub use validation::{parse_browser, parse_port};

/// Blazepack - a local dev server for an in-browser bundler
#[derive(Parser, Debug)]
#[command(
    name = "blazepack",
    version,
    about = "Blazing fast dev server powered by an in-browser bundler",
    long_about = "Blazepack serves a project directory to a bundler that runs in the browser.\n\
                  The browser receives the whole project once, then every file change is\n\
                  pushed to it as it happens."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Also asks connected browsers to log what they do with each change.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
