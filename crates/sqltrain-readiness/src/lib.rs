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

//! Deadline-bounded readiness probing for hard network dependencies.
//!
//! Layout: `target.rs` (targets and timing), `checker.rs` (single attempts),
//! `prober.rs` (polling loop), `state.rs` (observable progress).

pub mod checker;
pub mod error;
pub mod prober;
pub mod state;
pub mod target;

pub use checker::{Checker, TcpChecker};
pub use error::{ProbeError, ProbeResult, ReadinessTimeout, TransitionError};
pub use prober::{Prober, ReadyReport};
pub use state::{ReadinessSnapshot, ReadinessState, ReadinessTracker, is_valid_transition};
pub use target::{ProbeOptions, Target};
