//! Command-line surface for `musiclib`: thin argument parsing over the
//! library's callable operations.

pub mod commands;

pub use commands::{run, Cli, Command};
