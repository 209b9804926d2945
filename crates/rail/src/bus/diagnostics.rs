//! History, introspection and wait-for-event

use super::core::Bus;
use crate::error::BusError;
use crate::handler::Handler;
use crate::utils::{current_timestamp, lock, read, write};
use crate::value::Value;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

/// Number of entries a history query returns when the caller has no preference.
pub const DEFAULT_HISTORY_QUERY: usize = 10;

/// Deadline used by callers of [`Bus::wait_for`] that have no preference.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(5000);

/// One recorded emission.
///
/// `payload` is the payload as emitted, not a listener's copy, so it reflects any
/// mutation made through a shared reference afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub event: String,
    pub payload: Value,
    /// Unix time in milliseconds
    pub timestamp: i64,
}

/// Ring buffer of past emissions; `limit == 0` keeps everything.
pub(crate) struct History {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl History {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        if self.limit > 0 && self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The newest `limit` entries, oldest first.
    pub(crate) fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Bus {
    pub(super) fn record(&self, event: &str, payload: &Value) {
        self.inner.events_emitted.fetch_add(1, Ordering::Relaxed);
        write(&self.inner.history).push(HistoryEntry {
            event: event.to_string(),
            payload: payload.clone(),
            timestamp: current_timestamp(),
        });
    }

    /// The newest `limit` emissions, oldest first.
    pub fn get_history(&self, limit: usize) -> Vec<HistoryEntry> {
        read(&self.inner.history).recent(limit)
    }

    pub fn clear_history(&self) {
        write(&self.inner.history).clear();
        bus_trace!(self, bus = %self.inner.name, "History cleared");
    }

    /// Event name to the module names listening on it, in registration order.
    ///
    /// Anonymous listeners are reported as `"anonymous"`.
    pub fn get_events(&self) -> BTreeMap<String, Vec<String>> {
        self.inner.registry.summary()
    }

    /// Resolves with the payload of the next emission of `event`.
    ///
    /// The temporary listener is removed whether the event arrives or not.
    ///
    /// # Arguments
    ///
    /// * `event` - Name of the event to wait for
    /// * `timeout` - How long to wait, usually [`DEFAULT_WAIT_TIMEOUT`]
    ///
    /// # Returns
    ///
    /// The payload the listener received, or [`BusError::Timeout`] if nothing
    /// arrived in time.
    pub async fn wait_for(&self, event: &str, timeout: Duration) -> Result<Value, BusError> {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));

        let subscription = self.once(
            event,
            Handler::sync(move |payload| {
                if let Some(tx) = lock(&tx).take() {
                    let _ = tx.send(payload);
                }
                Ok(Value::Undefined)
            }),
            None,
        )?;

        let outcome = tokio::time::timeout(timeout, rx).await;
        subscription.unsubscribe();

        match outcome {
            Ok(Ok(payload)) => Ok(payload),
            _ => {
                warn!("⏱️ Timed out after {:?} waiting for event: {}", timeout, event);
                Err(BusError::Timeout {
                    event: event.to_string(),
                    timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(event: &str) -> HistoryEntry {
        HistoryEntry {
            event: event.to_string(),
            payload: Value::Null,
            timestamp: 0,
        }
    }

    #[test]
    fn test_recent_returns_newest_oldest_first() {
        let mut history = History::new(0);
        for name in ["a", "b", "c", "d"] {
            history.push(entry(name));
        }

        let events: Vec<String> = history.recent(2).into_iter().map(|e| e.event).collect();
        assert_eq!(events, vec!["c", "d"]);
        assert_eq!(history.recent(10).len(), 4);
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = History::new(3);
        for name in ["a", "b", "c", "d", "e"] {
            history.push(entry(name));
        }

        let events: Vec<String> = history.recent(10).into_iter().map(|e| e.event).collect();
        assert_eq!(events, vec!["c", "d", "e"]);
    }
}
