//! Statistics snapshot for the bus

use super::core::Bus;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;

/// Point-in-time counters describing a bus.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Bus name from its configuration
    pub name: String,
    /// Number of attached modules
    pub modules: usize,
    /// Number of event names with at least one listener
    pub events: usize,
    /// Total listeners across all events
    pub total_listeners: usize,
    /// Emissions since the bus was created (not reset by clearing history)
    pub events_emitted: u64,
    /// Listener failures since the bus was created
    pub handler_failures: u64,
}

impl Bus {
    /// Gets the current bus statistics
    pub fn get_stats(&self) -> BusStats {
        BusStats {
            name: self.inner.name.clone(),
            modules: self.inner.modules.len(),
            events: self.inner.registry.event_count(),
            total_listeners: self.inner.registry.total_listeners(),
            events_emitted: self.inner.events_emitted.load(Ordering::Relaxed),
            handler_failures: self.inner.handler_failures.load(Ordering::Relaxed),
        }
    }
}
