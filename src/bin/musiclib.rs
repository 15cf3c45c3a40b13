//! Entry point for the `musiclib` CLI.

use band_archivist::cli::Cli;
use clap::Parser;

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let code = band_archivist::cli::run(cli);
    std::process::exit(code);
}
