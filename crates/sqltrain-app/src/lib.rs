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

//! Application bootstrap for the SQL training service.
//!
//! Layout: `bootstrap.rs` (startup and shutdown sequence), `phase.rs`
//! (lifecycle states), `services.rs` (singleton table), `database.rs`
//! (Postgres pool), `health.rs` (health view), `cli.rs` (flags).

pub mod bootstrap;
pub mod cli;
pub mod database;
pub mod error;
mod health;
pub mod phase;
pub mod services;

pub use bootstrap::{
    Bootstrap, RegistryFactory, RunningApp, install_default_logging, report_config_errors, run,
    shutdown_signal,
};
pub use cli::Cli;
pub use database::Database;
pub use error::{
    EXIT_CONFIG, EXIT_FAILURE, EXIT_SOFTWARE, EXIT_TEMPFAIL, EXIT_UNAVAILABLE, StartupError,
    StartupResult,
};
pub use phase::{Phase, StatusHandle};
