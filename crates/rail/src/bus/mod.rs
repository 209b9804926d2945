//! Event bus - broken down by concern

/// Logs at debug level when the bus debug flag is set, at trace level otherwise.
macro_rules! bus_trace {
    ($bus:expr, $($arg:tt)+) => {
        if $bus.is_debug() {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

mod core;
mod diagnostics;
mod emitters;
mod lifecycle;
mod registry;
mod stats;

pub use self::core::Bus;
pub use diagnostics::{HistoryEntry, DEFAULT_HISTORY_QUERY, DEFAULT_WAIT_TIMEOUT};
pub use registry::Subscription;
pub use stats::BusStats;

/// Emitted when a listener fails; payload is `{module, event, error, timestamp}`.
pub const RAIL_ERROR: &str = "rail.error";
/// Emitted after a module connects; payload is `{name}`.
pub const MODULE_ATTACHED: &str = "rail.module.attached";
/// Emitted after a module is detached; payload is `{name}`.
pub const MODULE_DETACHED: &str = "rail.module.detached";
