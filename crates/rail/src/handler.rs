//! Listener callbacks and per-handler emission outcomes

use crate::error::HandlerError;
use crate::value::Value;
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Result returned by every listener callback.
pub type HandlerResult = Result<Value, HandlerError>;

pub(crate) type SyncFn = dyn Fn(Value) -> HandlerResult + Send + Sync;
pub(crate) type AsyncFn = dyn Fn(Value) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A listener callback.
///
/// Synchronous handlers finish before the emitter moves on to the next listener.
/// Asynchronous handlers produce a future: `emit` spawns it and moves on, while
/// `emit_async` awaits it alongside every other listener.
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
}

impl Handler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Handler::Async(Arc::new(move |payload| -> BoxFuture<'static, HandlerResult> {
            Box::pin(f(payload))
        }))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

/// Label used for listeners that were registered without an owning module.
pub const ANONYMOUS_MODULE: &str = "anonymous";

/// One registered listener.
#[derive(Debug)]
pub struct Listener {
    /// Bus-unique id, never reused
    pub id: u64,
    /// Owning module; `None` for anonymous listeners
    pub module: Option<String>,
    pub handler: Handler,
    /// Removes itself after its first invocation
    pub once: bool,
}

impl Listener {
    /// Module name for reporting purposes.
    pub fn module_label(&self) -> &str {
        self.module.as_deref().unwrap_or(ANONYMOUS_MODULE)
    }
}

/// Outcome of one listener during [`Bus::emit_async`](crate::Bus::emit_async).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerOutcome {
    pub module: String,
    /// Handler return value; `None` when it failed
    pub result: Option<Value>,
    /// Failure message; `None` when it succeeded
    pub error: Option<String>,
}

impl HandlerOutcome {
    pub(crate) fn from_result(module: String, result: HandlerResult) -> Self {
        match result {
            Ok(value) => Self {
                module,
                result: Some(value),
                error: None,
            },
            Err(e) => Self {
                module,
                result: None,
                error: Some(e.message().to_string()),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
