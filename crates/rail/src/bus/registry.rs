//! Listener registry and registration methods

use super::core::{Bus, BusInner};
use crate::error::BusError;
use crate::handler::{Handler, Listener};
use compact_str::CompactString;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Event name to insertion-ordered listener list.
///
/// Lists that become empty are removed, so every key present has at least one
/// listener. Ids come from a counter that never goes backwards.
pub(crate) struct Registry {
    listeners: DashMap<CompactString, Vec<Arc<Listener>>>,
    next_id: AtomicU64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn register(
        &self,
        event: &str,
        handler: Handler,
        module: Option<&str>,
        once: bool,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(Listener {
            id,
            module: module.map(str::to_string),
            handler,
            once,
        });

        self.listeners
            .entry(CompactString::new(event))
            .or_default()
            .push(listener);
        id
    }

    /// Removes one listener. Returns whether a listener with that id was found.
    pub(crate) fn unregister(&self, event: &str, id: u64) -> bool {
        let removed = match self.listeners.get_mut(event) {
            Some(mut list) => {
                let before = list.len();
                list.retain(|listener| listener.id != id);
                list.len() != before
            }
            None => return false,
        };

        self.listeners.remove_if(event, |_, list| list.is_empty());
        removed
    }

    /// Removes every listener owned by `module` across all events.
    pub(crate) fn unregister_by_module(&self, module: &str) -> usize {
        let mut removed = 0;
        self.listeners.retain(|_, list| {
            let before = list.len();
            list.retain(|listener| listener.module.as_deref() != Some(module));
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }

    /// Copy of the current listener list, safe to iterate while the registry changes.
    pub(crate) fn snapshot(&self, event: &str) -> Vec<Arc<Listener>> {
        self.listeners
            .get(event)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }

    pub(crate) fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map(|list| list.len()).unwrap_or(0)
    }

    pub(crate) fn total_listeners(&self) -> usize {
        self.listeners.iter().map(|entry| entry.value().len()).sum()
    }

    pub(crate) fn event_count(&self) -> usize {
        self.listeners.len()
    }

    /// Event name to the module labels listening on it, in registration order.
    pub(crate) fn summary(&self) -> BTreeMap<String, Vec<String>> {
        self.listeners
            .iter()
            .map(|entry| {
                let modules = entry
                    .value()
                    .iter()
                    .map(|listener| listener.module_label().to_string())
                    .collect();
                (entry.key().to_string(), modules)
            })
            .collect()
    }
}

/// Handle returned by listener registration; removes that one listener on demand.
///
/// Dropping a subscription does not unsubscribe. The handle only holds a weak
/// reference to the bus.
#[derive(Debug, Clone)]
pub struct Subscription {
    event: String,
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Removes the listener. Returns `false` if it was already gone or the bus was dropped.
    pub fn unsubscribe(&self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => inner.registry.unregister(&self.event, self.id),
            None => false,
        }
    }
}

impl Bus {
    /// Registers an anonymous listener.
    ///
    /// Anonymous listeners are never tied to a module and survive every detach.
    pub fn on(&self, event: &str, handler: Handler) -> Result<Subscription, BusError> {
        self.register(event, handler, None, false)
    }

    /// Registers a listener owned by `module`; detaching that module removes it.
    pub fn on_module(
        &self,
        event: &str,
        module: &str,
        handler: Handler,
    ) -> Result<Subscription, BusError> {
        self.register(event, handler, Some(module), false)
    }

    /// Registers a listener that removes itself after its first call.
    ///
    /// With `Some(module)` the listener is owned by that module and is also removed
    /// if the module detaches before it fires.
    pub fn once(
        &self,
        event: &str,
        handler: Handler,
        module: Option<&str>,
    ) -> Result<Subscription, BusError> {
        self.register(event, handler, module, true)
    }

    /// Removes a listener by id. Returns `true` only if that listener was registered.
    pub fn off(&self, event: &str, id: u64) -> bool {
        let removed = self.inner.registry.unregister(event, id);
        if removed {
            bus_trace!(self, event, id, "🗑️ Listener removed");
        }
        removed
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.registry.listener_count(event)
    }

    pub(super) fn register(
        &self,
        event: &str,
        handler: Handler,
        module: Option<&str>,
        once: bool,
    ) -> Result<Subscription, BusError> {
        if event.trim().is_empty() {
            return Err(BusError::InvalidHandler(
                "handler must be bound to a non-empty event name".to_string(),
            ));
        }

        let id = self.inner.registry.register(event, handler, module, once);
        bus_trace!(self, event, id, module = module.unwrap_or(crate::ANONYMOUS_MODULE), "📝 Listener registered");

        Ok(Subscription {
            event: event.to_string(),
            id,
            bus: self.downgrade(),
        })
    }

    /// Drops a `once` listener before it runs. Returns `false` if another
    /// emission already claimed it.
    pub(super) fn claim(&self, event: &str, listener: &Listener) -> bool {
        !listener.once || self.inner.registry.unregister(event, listener.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn noop() -> Handler {
        Handler::sync(|_| Ok(Value::Undefined))
    }

    #[test]
    fn test_ids_are_monotonic_and_never_reused() {
        let registry = Registry::new();
        let a = registry.register("e", noop(), None, false);
        assert!(registry.unregister("e", a));
        let b = registry.register("e", noop(), None, false);
        assert!(b > a);
    }

    #[test]
    fn test_empty_lists_are_pruned() {
        let registry = Registry::new();
        let id = registry.register("e", noop(), Some("m"), false);
        assert_eq!(registry.event_count(), 1);

        registry.unregister("e", id);
        assert_eq!(registry.event_count(), 0);
        assert!(registry.summary().is_empty());
    }

    #[test]
    fn test_unregister_unknown_id_keeps_list() {
        let registry = Registry::new();
        registry.register("e", noop(), None, false);

        assert!(!registry.unregister("e", 999));
        assert!(!registry.unregister("missing", 1));
        assert_eq!(registry.listener_count("e"), 1);
    }

    #[test]
    fn test_unregister_by_module_is_exact() {
        let registry = Registry::new();
        registry.register("a", noop(), Some("auth"), false);
        registry.register("a", noop(), Some("mail"), false);
        registry.register("b", noop(), Some("auth"), false);
        registry.register("b", noop(), None, false);
        registry.register("c", noop(), Some("auth"), false);

        assert_eq!(registry.unregister_by_module("auth"), 3);

        let summary = registry.summary();
        assert_eq!(summary.get("a"), Some(&vec!["mail".to_string()]));
        assert_eq!(summary.get("b"), Some(&vec![crate::ANONYMOUS_MODULE.to_string()]));
        assert!(!summary.contains_key("c"));
        assert_eq!(registry.total_listeners(), 2);
    }

    #[test]
    fn test_anonymous_label_does_not_claim_anonymous_listeners() {
        let registry = Registry::new();
        registry.register("e", noop(), None, false);
        registry.register("e", noop(), Some(crate::ANONYMOUS_MODULE), false);

        assert_eq!(registry.unregister_by_module(crate::ANONYMOUS_MODULE), 1);
        assert_eq!(registry.listener_count("e"), 1);
    }

    #[test]
    fn test_snapshot_is_detached_from_later_changes() {
        let registry = Registry::new();
        let first = registry.register("e", noop(), None, false);
        let snapshot = registry.snapshot("e");

        registry.unregister("e", first);
        registry.register("e", noop(), None, false);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, first);
    }
}
