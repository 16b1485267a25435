//! Function registry: the authoritative name → implementation table.
//!
//! Lookups take a snapshot of the current table, so registrations and removals
//! never disturb calls that are already in flight.

use crate::error::RpcError;
use crate::value::{from_value, Value};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// A remotely callable function.
///
/// Implementations return `anyhow::Result` so that any error type can be raised;
/// an [`RpcError`] anywhere in the chain is forwarded to the caller unchanged,
/// anything else is reported as an internal server error.
#[async_trait]
pub trait RpcFunction: Send + Sync {
    async fn call(&self, ctx: CallContext, params: Params) -> anyhow::Result<Value>;
}

/// Adapter turning an async closure into an [`RpcFunction`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a registrable function.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(CallContext, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RpcFunction for FnHandler<F>
where
    F: Fn(CallContext, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn call(&self, ctx: CallContext, params: Params) -> anyhow::Result<Value> {
        (self.f)(ctx, params).await
    }
}

/// Positional call arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<Value>);

impl Params {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }

    /// Deserialize the argument at `index`.
    ///
    /// A missing (or null) argument that the target type cannot represent is
    /// `MISSING_PARAMETER`; any other mismatch is `INVALID_ARGUMENTS`.
    pub fn arg<T: DeserializeOwned>(&self, index: usize, name: &str) -> Result<T, RpcError> {
        let value = self.0.get(index).cloned().unwrap_or(Value::Null);
        let absent = value.is_null();

        from_value(value).map_err(|e| {
            if absent {
                RpcError::missing_parameter(name)
            } else {
                RpcError::invalid_arguments(format!("Invalid value for parameter '{}'", name))
                    .with_context("parameter", name)
                    .with_context("reason", e.message)
            }
        })
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// Per-call context handed to every function.
///
/// Carries an optional application state object installed by the host
/// (e.g. a database handle); functions recover it with [`CallContext::get`].
#[derive(Clone, Default)]
pub struct CallContext {
    state: Option<Arc<dyn Any + Send + Sync>>,
}

impl CallContext {
    pub fn new<T: Any + Send + Sync>(state: Arc<T>) -> Self {
        Self {
            state: Some(state),
        }
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.state.clone()?.downcast::<T>().ok()
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("has_state", &self.state.is_some())
            .finish()
    }
}

type FunctionTable = HashMap<String, Arc<dyn RpcFunction>>;

/// Registry of callable functions keyed by identity (`module_path.function_name`).
#[derive(Default)]
pub struct FunctionRegistry {
    table: RwLock<Arc<FunctionTable>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the function under `name`.
    pub fn register(&self, name: impl Into<String>, function: impl RpcFunction + 'static) {
        let name = name.into();
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = FunctionTable::clone(&guard);
        if next.insert(name.clone(), Arc::new(function)).is_some() {
            info!("Replaced RPC function {}", name);
        } else {
            debug!("Registered RPC function {}", name);
        }
        *guard = Arc::new(next);
    }

    /// Remove a function. Returns whether it was present.
    pub fn unregister(&self, name: &str) -> bool {
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.contains_key(name) {
            return false;
        }
        let mut next = FunctionTable::clone(&guard);
        next.remove(name);
        *guard = Arc::new(next);
        debug!("Unregistered RPC function {}", name);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RpcFunction>> {
        self.snapshot().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains_key(name)
    }

    /// Registered identities, sorted.
    pub fn list_registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn snapshot(&self) -> Arc<FunctionTable> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.list_registered())
            .finish()
    }
}
