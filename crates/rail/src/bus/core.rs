//! Core Bus implementation

use super::diagnostics::History;
use super::lifecycle::ModuleEntry;
use super::registry::Registry;
use crate::config::BusConfig;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// The central dispatch object coordinating modules, listeners and emissions.
///
/// `Bus` is a cheap handle: clones share the same registry, module table and history,
/// so a module can keep a clone around and emit from inside its own listeners.
/// Every emission dispatches over a snapshot of the listener list taken when it
/// starts, which makes re-entrant registration, removal, attach and detach safe.
#[derive(Clone)]
pub struct Bus {
    pub(super) inner: Arc<BusInner>,
}

pub(crate) struct BusInner {
    pub(super) name: String,
    pub(super) debug: AtomicBool,
    pub(super) clone: AtomicBool,
    pub(super) registry: Registry,
    pub(super) modules: DashMap<String, ModuleEntry>,
    pub(super) module_order: AtomicU64,
    pub(super) history: RwLock<History>,
    pub(super) events_emitted: AtomicU64,
    pub(super) handler_failures: AtomicU64,
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("name", &self.inner.name)
            .field("debug", &self.is_debug())
            .field("clone", &self.clone_enabled())
            .field("modules", &self.inner.modules.len())
            .field("listeners", &"[listeners]")
            .finish()
    }
}

impl Bus {
    /// Creates a bus with no modules and no listeners.
    pub fn new(config: BusConfig) -> Self {
        tracing::info!(
            "🚌 Creating bus '{}' (clone: {}, history limit: {})",
            config.name,
            config.clone,
            config.history_limit
        );

        Self {
            inner: Arc::new(BusInner {
                name: config.name,
                debug: AtomicBool::new(config.debug),
                clone: AtomicBool::new(config.clone),
                registry: Registry::new(),
                modules: DashMap::new(),
                module_order: AtomicU64::new(0),
                history: RwLock::new(History::new(config.history_limit)),
                events_emitted: AtomicU64::new(0),
                handler_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a bus with default settings and the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(BusConfig::named(name))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    pub fn is_debug(&self) -> bool {
        self.inner.debug.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, debug: bool) {
        self.inner.debug.store(debug, Ordering::Relaxed);
    }

    /// Whether listeners currently receive their own deep copy of each payload.
    #[inline]
    pub fn clone_enabled(&self) -> bool {
        self.inner.clone.load(Ordering::Relaxed)
    }

    /// Turns clone-on-emit on or off. Takes effect from the next emission.
    pub fn set_clone(&self, clone: bool) {
        self.inner.clone.store(clone, Ordering::Relaxed);
        bus_trace!(self, bus = %self.inner.name, clone, "clone-on-emit changed");
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<BusInner> {
        Arc::downgrade(&self.inner)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}
