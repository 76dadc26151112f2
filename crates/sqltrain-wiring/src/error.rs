//! # Design
//!
//! - Registry errors are detected once at build time; resolution errors at `get`.
//! - Teardown keeps going after failures and reports them all together.

use thiserror::Error;

use crate::key::ServiceKey;

/// Boxed error returned by constructors and teardown hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Problems with the static dependency table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WiringError {
    /// Two entries share a key.
    #[error("service key registered more than once")]
    DuplicateKey {
        /// Duplicated key.
        key: ServiceKey,
    },
    /// An entry depends on a key nobody registered.
    #[error("service depends on an unregistered key")]
    UnknownDependency {
        /// Entry declaring the dependency.
        key: ServiceKey,
        /// Missing dependency.
        dependency: ServiceKey,
    },
    /// The dependency graph contains a cycle.
    #[error("service dependency cycle")]
    Cycle {
        /// Keys along the cycle; the first key is repeated at the end.
        path: Vec<ServiceKey>,
    },
}

impl WiringError {
    /// Cycle rendered as `a -> b -> a`, when this is a cycle.
    #[must_use]
    pub fn cycle_path(&self) -> Option<String> {
        match self {
            Self::Cycle { path } => Some(
                path.iter()
                    .map(|key| key.name())
                    .collect::<Vec<_>>()
                    .join(" -> "),
            ),
            Self::DuplicateKey { .. } | Self::UnknownDependency { .. } => None,
        }
    }
}

/// Failures while resolving a singleton.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The key was never registered.
    #[error("service key not registered")]
    NotRegistered {
        /// Requested key.
        key: ServiceKey,
    },
    /// A constructor asked for a dependency it did not declare.
    #[error("service requested an undeclared dependency")]
    Undeclared {
        /// Constructing service.
        key: ServiceKey,
        /// Requested dependency.
        dependency: ServiceKey,
    },
    /// The stored value has a different type than the key expects.
    #[error("service type does not match its key")]
    TypeMismatch {
        /// Requested key.
        key: ServiceKey,
        /// Type the key expects.
        expected: &'static str,
        /// Type that was registered.
        registered: &'static str,
    },
    /// The constructor returned an error.
    #[error("service constructor failed")]
    ConstructorFailed {
        /// Service that failed.
        key: ServiceKey,
        /// Constructor error.
        #[source]
        source: BoxError,
    },
    /// The container was shut down.
    #[error("container is shut down")]
    ShutDown {
        /// Requested key.
        key: ServiceKey,
    },
}

impl ResolveError {
    /// Key the failure is attributed to.
    #[must_use]
    pub const fn key(&self) -> ServiceKey {
        match self {
            Self::NotRegistered { key }
            | Self::Undeclared { key, .. }
            | Self::TypeMismatch { key, .. }
            | Self::ConstructorFailed { key, .. }
            | Self::ShutDown { key } => *key,
        }
    }
}

/// A teardown hook that failed.
#[derive(Debug, Error)]
#[error("service teardown failed")]
pub struct TeardownFailure {
    /// Service whose hook failed.
    pub key: ServiceKey,
    /// Hook error.
    #[source]
    pub source: BoxError,
}

/// Every teardown failure from one shutdown.
#[derive(Debug, Error)]
#[error("one or more services failed to tear down")]
pub struct ShutdownErrors {
    /// Failures in teardown order.
    pub failures: Vec<TeardownFailure>,
}

impl ShutdownErrors {
    /// Keys whose teardown failed, in teardown order.
    #[must_use]
    pub fn keys(&self) -> Vec<ServiceKey> {
        self.failures.iter().map(|failure| failure.key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    #[test]
    fn cycle_path_joins_keys() {
        let a: Key<()> = Key::new("a");
        let b: Key<()> = Key::new("b");
        let err = WiringError::Cycle {
            path: vec![a.id(), b.id(), a.id()],
        };
        assert_eq!(err.cycle_path().as_deref(), Some("a -> b -> a"));
        assert_eq!(err.to_string(), "service dependency cycle");
    }
}
