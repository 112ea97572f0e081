//! Strata CLI binary.

use std::process;

use clap::Parser;
use strata::cli::{StrataArgs, execute_command};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = StrataArgs::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
