//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        CliError::BundlerCrashed { title, message } => miette::miette!(
            help = "Fix the error in your sources and start blazepack again",
            "The preview crashed and the dev server was terminated\n\n{}: {}",
            title,
            message
        ),
        CliError::UnknownTemplate(msg) => miette::miette!(
            help = "Add a sandbox.config.json with a \"template\" field",
            "{}",
            msg
        ),
        _ => miette::miette!("{}", err),
    }
}
