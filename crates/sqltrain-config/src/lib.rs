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

//! Layered, strictly validated settings for the SQL training service.
//!
//! Layout: `source.rs` (configuration sources), `schema.rs` (field table),
//! `validate.rs` (coercion/constraints), `loader.rs` (merge + validation),
//! `model.rs` (immutable `Settings`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod schema;
pub mod source;
mod validate;

pub use defaults::{APPLICATION_CONFIG_ENV, OWNED_ENV_PREFIXES};
pub use error::{ConfigError, ConfigErrors, ValueKind};
pub use loader::{LoaderOptions, load, load_with};
pub use model::{
    AppSettings, DatabaseSettings, HardDependency, HttpSettings, LogLevel, LogOutput,
    LoggingSettings, ReadinessSettings, Secret, Settings,
};
pub use source::{ConfigSource, RawValue, Supplied};
