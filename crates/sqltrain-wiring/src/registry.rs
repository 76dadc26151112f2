//! Explicit service registration and graph validation.
//!
//! # Design
//! - Entries are declared up front with their dependency keys; nothing is discovered.
//! - `build` validates the whole graph iteratively and yields a dependency-first plan.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::info;

use crate::container::{Container, Dependencies};
use crate::error::{BoxError, WiringError};
use crate::key::{Key, ServiceKey};

pub(crate) type Instance = Arc<dyn Any + Send + Sync>;
pub(crate) type Constructor =
    Box<dyn Fn(Dependencies) -> BoxFuture<'static, Result<Instance, BoxError>> + Send + Sync>;
pub(crate) type Teardown =
    Box<dyn Fn(Instance) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Callback invoked after each successful construction.
pub type ConstructionObserver = Arc<dyn Fn(ServiceKey, Duration) + Send + Sync>;

pub(crate) enum Provider {
    Value(Instance),
    Constructor(Constructor),
}

pub(crate) struct Entry {
    pub(crate) key: ServiceKey,
    pub(crate) type_name: &'static str,
    pub(crate) dependencies: Vec<ServiceKey>,
    pub(crate) provider: Provider,
    pub(crate) teardown: Option<Teardown>,
}

/// Static table of services, turned into a [`Container`] by [`Registry::build`].
#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
    observer: Option<ConstructionObserver>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lazily constructed singleton.
    ///
    /// The constructor only sees the keys listed in `dependencies`.
    pub fn register<T, F, Fut>(
        &mut self,
        key: Key<T>,
        dependencies: &[ServiceKey],
        constructor: F,
    ) -> Registration<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        let constructor: Constructor = Box::new(move |deps| {
            constructor(deps)
                .map(|built| built.map(|value| Arc::new(value) as Instance))
                .boxed()
        });
        self.push(Entry {
            key: key.id(),
            type_name: type_name::<T>(),
            dependencies: dependencies.to_vec(),
            provider: Provider::Constructor(constructor),
            teardown: None,
        })
    }

    /// Register an already constructed singleton.
    pub fn register_instance<T>(&mut self, key: Key<T>, value: T) -> Registration<'_, T>
    where
        T: Send + Sync + 'static,
    {
        self.push(Entry {
            key: key.id(),
            type_name: type_name::<T>(),
            dependencies: Vec::new(),
            provider: Provider::Value(Arc::new(value)),
            teardown: None,
        })
    }

    /// Observe every successful construction (key and duration).
    pub fn observe_constructions(&mut self, observer: ConstructionObserver) {
        self.observer = Some(observer);
    }

    fn push<T>(&mut self, entry: Entry) -> Registration<'_, T> {
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        Registration {
            entry: &mut self.entries[index],
            _marker: PhantomData,
        }
    }

    /// Validate the graph and produce a container.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey`, `UnknownDependency` or `Cycle` when the table is inconsistent.
    pub fn build(self) -> Result<Container, WiringError> {
        let mut index = HashMap::with_capacity(self.entries.len());
        for (position, entry) in self.entries.iter().enumerate() {
            if index.insert(entry.key, position).is_some() {
                return Err(WiringError::DuplicateKey { key: entry.key });
            }
        }
        for entry in &self.entries {
            if let Some(dependency) = entry
                .dependencies
                .iter()
                .find(|dependency| !index.contains_key(*dependency))
            {
                return Err(WiringError::UnknownDependency {
                    key: entry.key,
                    dependency: *dependency,
                });
            }
        }

        let plan = plan(&self.entries, &index)?;
        info!(services = self.entries.len(), "service registry built");
        Ok(Container::new(self.entries, index, plan, self.observer))
    }
}

/// Handle returned by registration to attach a teardown hook.
pub struct Registration<'a, T> {
    entry: &'a mut Entry,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Registration<'_, T>
where
    T: Send + Sync + 'static,
{
    /// Run `hook` with the instance during shutdown.
    pub fn on_shutdown<F, Fut>(self, hook: F)
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let type_name = self.entry.type_name;
        self.entry.teardown = Some(Box::new(move |instance: Instance| {
            match instance.downcast::<T>() {
                Ok(typed) => hook(typed).boxed(),
                Err(_) => async move {
                    Err::<(), BoxError>(format!("teardown expected {type_name}").into())
                }
                .boxed(),
            }
        }));
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Depth-first order with dependencies before dependents, using an explicit stack.
fn plan(entries: &[Entry], index: &HashMap<ServiceKey, usize>) -> Result<Vec<usize>, WiringError> {
    let mut marks = vec![Mark::Unvisited; entries.len()];
    let mut order = Vec::with_capacity(entries.len());
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..entries.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::Visiting;
        stack.push((root, 0));

        while let Some(&(node, next)) = stack.last() {
            let Some(dependency) = entries[node].dependencies.get(next) else {
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let Some(&child) = index.get(dependency) else {
                continue;
            };
            match marks[child] {
                Mark::Unvisited => {
                    marks[child] = Mark::Visiting;
                    stack.push((child, 0));
                }
                Mark::Visiting => {
                    let path = stack
                        .iter()
                        .skip_while(|(position, _)| *position != child)
                        .map(|(position, _)| entries[*position].key)
                        .chain(std::iter::once(entries[child].key))
                        .collect();
                    return Err(WiringError::Cycle { path });
                }
                Mark::Done => {}
            }
        }
    }

    Ok(order)
}
