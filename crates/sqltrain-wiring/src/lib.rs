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

//! Explicit dependency container for process-wide singletons.
//!
//! Layout: `key.rs` (typed keys), `registry.rs` (registration + graph checks),
//! `container.rs` (single-flight construction and ordered teardown).

pub mod container;
pub mod error;
pub mod key;
pub mod registry;

pub use container::{Container, Dependencies, WeakContainer};
pub use error::{BoxError, ResolveError, ShutdownErrors, TeardownFailure, WiringError};
pub use key::{Key, ServiceKey};
pub use registry::{ConstructionObserver, Registration, Registry};
