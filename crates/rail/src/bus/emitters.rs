//! Event emission

use super::core::Bus;
use super::RAIL_ERROR;
use crate::error::HandlerError;
use crate::handler::{AsyncFn, Handler, HandlerOutcome, HandlerResult, Listener, SyncFn};
use crate::utils::{current_timestamp, panic_to_error};
use crate::value::Value;
use futures::future::{join_all, BoxFuture, CatchUnwind};
use futures::task::noop_waker_ref;
use futures::FutureExt;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{error, warn};

type GuardedFuture = CatchUnwind<AssertUnwindSafe<BoxFuture<'static, HandlerResult>>>;

impl Bus {
    /// Emits an event synchronously and returns how many listeners handled it.
    ///
    /// Listeners run in registration order over a snapshot taken at the start of the
    /// call. An asynchronous listener runs up to its first suspension point before the
    /// next listener is called; whatever remains is spawned onto the current tokio
    /// runtime and not awaited. Failing listeners never stop the others and never
    /// surface here; they are reported through `rail.error`.
    ///
    /// # Arguments
    ///
    /// * `event` - Name of the event to emit
    /// * `payload` - Payload handed to every listener, deep-cloned per listener when
    ///   cloning is enabled
    ///
    /// # Returns
    ///
    /// The number of listeners invoked without a synchronous failure. A synchronous
    /// listener counts once it returns `Ok`. An asynchronous listener counts once it
    /// has produced its future, even if that future later fails.
    pub fn emit(&self, event: &str, payload: impl Into<Value>) -> usize {
        self.dispatch(event, payload.into(), self.clone_enabled())
    }

    /// Emits an event to every listener concurrently and waits for all of them.
    ///
    /// A failing listener yields an outcome with `error` set and is also reported
    /// through `rail.error`; the others still run to completion.
    ///
    /// # Arguments
    ///
    /// * `event` - Name of the event to emit
    /// * `payload` - Payload handed to every listener
    ///
    /// # Returns
    ///
    /// One [`HandlerOutcome`] per listener, in registration order regardless of
    /// completion order.
    pub async fn emit_async(&self, event: &str, payload: impl Into<Value>) -> Vec<HandlerOutcome> {
        let payload = payload.into();
        self.record(event, &payload);

        let listeners = self.inner.registry.snapshot(event);
        if listeners.is_empty() {
            bus_trace!(self, event, "📭 No listeners");
            return Vec::new();
        }

        let clone = self.clone_enabled();
        bus_trace!(self, event, listeners = listeners.len(), clone, "📤 Emitting async");

        let units = listeners
            .into_iter()
            .filter(|listener| self.claim(event, listener))
            .map(|listener| {
                let dispatched = if clone { payload.deep_clone() } else { payload.clone() };
                async move {
                    let module = listener.module_label().to_string();
                    let result = run_to_completion(&listener, dispatched).await;
                    if let Err(e) = &result {
                        self.report_failure(event, &module, e);
                    }
                    HandlerOutcome::from_result(module, result)
                }
            })
            .collect::<Vec<_>>();

        join_all(units).await
    }

    /// One synchronous pass over the listener snapshot of `event`.
    fn dispatch(&self, event: &str, payload: Value, clone: bool) -> usize {
        self.record(event, &payload);

        let listeners = self.inner.registry.snapshot(event);
        if listeners.is_empty() {
            bus_trace!(self, event, "📭 No listeners");
            return 0;
        }

        bus_trace!(self, event, listeners = listeners.len(), clone, "📤 Emitting");

        let mut handled = 0;
        for listener in listeners {
            if !self.claim(event, &listener) {
                continue;
            }

            let dispatched = if clone { payload.deep_clone() } else { payload.clone() };
            let module = listener.module_label();

            match &listener.handler {
                Handler::Sync(callback) => match invoke_sync(&**callback, dispatched) {
                    Ok(_) => handled += 1,
                    Err(e) => self.report_failure(event, module, &e),
                },
                Handler::Async(callback) => {
                    let mut future = match start_async(&**callback, dispatched) {
                        Ok(future) => future,
                        Err(e) => {
                            self.report_failure(event, module, &e);
                            continue;
                        }
                    };

                    // Run the part before the first suspension point now, in order
                    let mut cx = Context::from_waker(noop_waker_ref());
                    match future.poll_unpin(&mut cx) {
                        Poll::Ready(result) => {
                            handled += 1;
                            if let Err(e) = settle(result) {
                                self.report_failure(event, module, &e);
                            }
                        }
                        Poll::Pending => match tokio::runtime::Handle::try_current() {
                            Ok(handle) => {
                                let bus = self.downgrade();
                                let event = event.to_string();
                                let module = module.to_string();
                                handle.spawn(async move {
                                    let result = settle(future.await);
                                    if let (Err(e), Some(inner)) = (result, bus.upgrade()) {
                                        Bus { inner }.report_failure(&event, &module, &e);
                                    }
                                });
                                handled += 1;
                            }
                            Err(_) => {
                                let e = HandlerError::new(
                                    "no tokio runtime available to run async handler",
                                );
                                self.report_failure(event, module, &e);
                            }
                        },
                    }
                }
            }
        }

        handled
    }

    /// Logs a listener failure and reports it through `rail.error`.
    ///
    /// The report is always deep-cloned for its listeners, whatever the bus setting.
    /// Failures of `rail.error` listeners themselves are only logged.
    fn report_failure(&self, event: &str, module: &str, e: &HandlerError) {
        self.inner.handler_failures.fetch_add(1, Ordering::Relaxed);
        error!("❌ Handler in module {} failed on {}: {}", module, event, e);

        if event == RAIL_ERROR {
            warn!("⚠️ Not re-reporting failure raised while handling {}", RAIL_ERROR);
            return;
        }

        let report = Value::object_from([
            ("module", Value::from(module)),
            ("event", Value::from(event)),
            ("error", Value::from(e.message())),
            ("timestamp", Value::from(current_timestamp())),
        ]);
        self.dispatch(RAIL_ERROR, report, true);
    }
}

fn invoke_sync(callback: &SyncFn, payload: Value) -> HandlerResult {
    catch_unwind(AssertUnwindSafe(|| callback(payload)))
        .unwrap_or_else(|panic_info| Err(panic_to_error(panic_info)))
}

/// Calls an async handler and wraps its future so panics while polling are caught too.
///
/// A panic raised before the handler hands back its future is returned as an error.
fn start_async(callback: &AsyncFn, payload: Value) -> Result<GuardedFuture, HandlerError> {
    catch_unwind(AssertUnwindSafe(|| callback(payload)))
        .map(|future| AssertUnwindSafe(future).catch_unwind())
        .map_err(panic_to_error)
}

fn settle(result: Result<HandlerResult, Box<dyn Any + Send>>) -> HandlerResult {
    result.unwrap_or_else(|panic_info| Err(panic_to_error(panic_info)))
}

async fn run_to_completion(listener: &Arc<Listener>, payload: Value) -> HandlerResult {
    match &listener.handler {
        Handler::Sync(callback) => invoke_sync(&**callback, payload),
        Handler::Async(callback) => match start_async(&**callback, payload) {
            Ok(future) => settle(future.await),
            Err(e) => Err(e),
        },
    }
}
