#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint that validates configuration, waits for dependencies,
//! wires services, and serves until a shutdown signal.

use std::process::ExitCode;

use clap::Parser;
use sqltrain_app::{
    Bootstrap, Cli, EXIT_CONFIG, install_default_logging, report_config_errors, run,
};
use sqltrain_config::ConfigErrors;

/// Run the service and translate the outcome into a process exit code.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let sources = match cli.sources() {
        Ok(sources) => sources,
        Err(issue) => {
            install_default_logging();
            report_config_errors(&ConfigErrors::from(issue));
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match run(Bootstrap::new(sources)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(err.exit_code()),
    }
}
