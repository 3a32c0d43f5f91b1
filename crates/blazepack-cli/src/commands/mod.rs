//! Command implementations.
//!
//! - [`start`] - Run the dev server for a project directory
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod start;

pub use start::execute as start_execute;
