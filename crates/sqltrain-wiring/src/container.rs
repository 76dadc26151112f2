//! Singleton container built from a validated [`Registry`](crate::Registry).
//!
//! # Design
//! - One `OnceCell` per key: concurrent first requests run the constructor once.
//! - Construction order is recorded so teardown can run in exact reverse.
//! - After shutdown every request fails; there is no reinitialisation. A
//!   construction that finishes after shutdown is torn down immediately.
//! - Observers that live inside the container hold a [`WeakContainer`].

use std::any::type_name;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::error::{ResolveError, ShutdownErrors, TeardownFailure};
use crate::key::{Key, ServiceKey};
use crate::registry::{ConstructionObserver, Entry, Instance, Provider};

struct Slot {
    entry: Entry,
    cell: OnceCell<Instance>,
}

struct Inner {
    slots: Vec<Slot>,
    index: HashMap<ServiceKey, usize>,
    plan: Vec<usize>,
    constructed: Mutex<Vec<usize>>,
    shut_down: AtomicBool,
    observer: Option<ConstructionObserver>,
}

/// Owner of every long-lived singleton. Cloning shares the same singletons.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    pub(crate) fn new(
        entries: Vec<Entry>,
        index: HashMap<ServiceKey, usize>,
        plan: Vec<usize>,
        observer: Option<ConstructionObserver>,
    ) -> Self {
        let slots = entries
            .into_iter()
            .map(|entry| {
                let cell = match &entry.provider {
                    Provider::Value(value) => OnceCell::new_with(Some(Arc::clone(value))),
                    Provider::Constructor(_) => OnceCell::new(),
                };
                Slot { entry, cell }
            })
            .collect::<Vec<_>>();
        let constructed = plan
            .iter()
            .copied()
            .filter(|position| slots[*position].cell.initialized())
            .collect();

        Self {
            inner: Arc::new(Inner {
                slots,
                index,
                plan,
                constructed: Mutex::new(constructed),
                shut_down: AtomicBool::new(false),
                observer,
            }),
        }
    }

    /// Resolve a singleton, constructing it and its dependencies on first use.
    ///
    /// # Errors
    ///
    /// Returns `NotRegistered` for unknown keys, `ConstructorFailed` when a
    /// constructor fails and `ShutDown` after [`Container::shutdown`].
    pub async fn get<T>(&self, key: Key<T>) -> Result<Arc<T>, ResolveError>
    where
        T: Send + Sync + 'static,
    {
        let instance = self.resolve(key.id()).await?;
        instance
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                key: key.id(),
                expected: type_name::<T>(),
                registered: self
                    .inner
                    .index
                    .get(&key.id())
                    .map_or("unknown", |position| {
                        self.inner.slots[*position].entry.type_name
                    }),
            })
    }

    /// Whether `key` has been constructed.
    #[must_use]
    pub fn is_constructed(&self, key: ServiceKey) -> bool {
        self.inner
            .index
            .get(&key)
            .is_some_and(|position| self.inner.slots[*position].cell.initialized())
    }

    /// Registered keys in dependency-first order.
    #[must_use]
    pub fn keys(&self) -> Vec<ServiceKey> {
        self.inner
            .plan
            .iter()
            .map(|position| self.inner.slots[*position].entry.key)
            .collect()
    }

    /// Construct every registered singleton in dependency order.
    ///
    /// # Errors
    ///
    /// Returns the first resolution failure.
    pub async fn initialize_all(&self) -> Result<(), ResolveError> {
        for position in &self.inner.plan {
            self.resolve(self.inner.slots[*position].entry.key).await?;
        }
        Ok(())
    }

    /// Tear down constructed singletons in reverse construction order.
    ///
    /// Every hook runs even when earlier hooks fail. Calling this twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns every hook failure.
    pub async fn shutdown(&self) -> Result<(), ShutdownErrors> {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let order = std::mem::take(
            &mut *self
                .inner
                .constructed
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        let mut failures = Vec::new();
        for position in order.into_iter().rev() {
            let slot = &self.inner.slots[position];
            let (Some(teardown), Some(instance)) = (&slot.entry.teardown, slot.cell.get()) else {
                continue;
            };
            match teardown(Arc::clone(instance)).await {
                Ok(()) => info!(service = %slot.entry.key, "service torn down"),
                Err(source) => {
                    warn!(service = %slot.entry.key, error = %source, "service teardown failed");
                    failures.push(TeardownFailure {
                        key: slot.entry.key,
                        source,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShutdownErrors { failures })
        }
    }

    /// Handle that does not keep the singletons alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    async fn discard(entry: &Entry, instance: Instance) {
        warn!(service = %entry.key, "service constructed after shutdown; tearing down");
        let Some(teardown) = &entry.teardown else {
            return;
        };
        if let Err(source) = teardown(instance).await {
            warn!(service = %entry.key, error = %source, "service teardown failed");
        }
    }

    fn resolve(&self, key: ServiceKey) -> BoxFuture<'_, Result<Instance, ResolveError>> {
        async move {
            if self.inner.shut_down.load(Ordering::Acquire) {
                return Err(ResolveError::ShutDown { key });
            }
            let Some(&position) = self.inner.index.get(&key) else {
                error!(service = %key, "service key not registered");
                return Err(ResolveError::NotRegistered { key });
            };
            let instance = self.inner.slots[position]
                .cell
                .get_or_try_init(|| self.construct(position))
                .await?;
            Ok(Arc::clone(instance))
        }
        .boxed()
    }

    async fn construct(&self, position: usize) -> Result<Instance, ResolveError> {
        let entry = &self.inner.slots[position].entry;
        let constructor = match &entry.provider {
            Provider::Value(value) => return Ok(Arc::clone(value)),
            Provider::Constructor(constructor) => constructor,
        };

        for dependency in &entry.dependencies {
            self.resolve(*dependency).await?;
        }

        let started = Instant::now();
        let deps = Dependencies {
            container: self.clone(),
            owner: entry.key,
            declared: entry.dependencies.clone(),
        };
        let instance = constructor(deps)
            .await
            .map_err(|source| {
                warn!(service = %entry.key, error = %source, "service constructor failed");
                ResolveError::ConstructorFailed {
                    key: entry.key,
                    source,
                }
            })?;

        let elapsed = started.elapsed();
        let recorded = {
            let mut constructed = self
                .inner
                .constructed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let open = !self.inner.shut_down.load(Ordering::Acquire);
            if open {
                constructed.push(position);
            }
            open
        };
        if !recorded {
            Self::discard(entry, instance).await;
            return Err(ResolveError::ShutDown { key: entry.key });
        }
        if let Some(observer) = &self.inner.observer {
            observer(entry.key, elapsed);
        }
        info!(
            service = %entry.key,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "service constructed"
        );
        Ok(instance)
    }
}

/// Non-owning container handle.
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<Inner>,
}

impl WeakContainer {
    /// The container, while any strong handle still exists.
    #[must_use]
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

/// Dependency view handed to a constructor; limited to its declared keys.
pub struct Dependencies {
    container: Container,
    owner: ServiceKey,
    declared: Vec<ServiceKey>,
}

impl Dependencies {
    /// Service being constructed.
    #[must_use]
    pub const fn owner(&self) -> ServiceKey {
        self.owner
    }

    /// Resolve a declared dependency.
    ///
    /// # Errors
    ///
    /// Returns `Undeclared` for keys missing from the registration, or any
    /// resolution failure of the dependency itself.
    pub async fn get<T>(&self, key: Key<T>) -> Result<Arc<T>, ResolveError>
    where
        T: Send + Sync + 'static,
    {
        if !self.declared.contains(&key.id()) {
            return Err(ResolveError::Undeclared {
                key: self.owner,
                dependency: key.id(),
            });
        }
        self.container.get(key).await
    }
}
