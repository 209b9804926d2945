//! # Rail
//!
//! An in-process publish/subscribe event bus that keeps independently attached
//! modules from seeing each other's mutations.
//!
//! ## Key Features
//!
//! - **Clone-on-emit**: every listener receives its own deep copy of the payload
//! - **Module lifecycle**: named modules connect, register listeners and detach
//!   cleanly, with rollback when `connect` fails
//! - **Failure isolation**: a failing listener never stops the others; failures are
//!   reported through the `rail.error` event
//! - **Sync and async emission**: `emit` returns immediately with a handled count,
//!   `emit_async` waits for every listener and returns per-listener outcomes
//! - **Diagnostics**: bounded history, stats snapshots and `wait_for`
//!
//! ## Example
//!
//! ```rust,no_run
//! use rail::{Bus, BusConfig, FnModule, Handler, Value};
//!
//! # async fn example() -> Result<(), rail::BusError> {
//! let bus = Bus::new(BusConfig::named("app"));
//!
//! bus.attach(FnModule::new("greeter").on_connect(|bus| {
//!     bus.on_module("user.joined", "greeter", Handler::sync(|user: Value| {
//!         let name = user.get("name").unwrap_or_default();
//!         Ok(Value::from(format!("hello {:?}", name)))
//!     }))?;
//!     Ok(())
//! }))?;
//!
//! let handled = bus.emit("user.joined", Value::object_from([("name", "Ada")]));
//! assert_eq!(handled, 1);
//!
//! let outcomes = bus.emit_async("user.joined", Value::object_from([("name", "Lin")])).await;
//! assert!(outcomes[0].is_ok());
//!
//! bus.detach("greeter");
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod module;
pub mod utils;
pub mod value;

pub use bus::{
    Bus, BusStats, HistoryEntry, Subscription, DEFAULT_HISTORY_QUERY, DEFAULT_WAIT_TIMEOUT,
    MODULE_ATTACHED, MODULE_DETACHED, RAIL_ERROR,
};
pub use config::{BusConfig, LoggingSettings, RailConfig};
pub use error::{BusError, HandlerError};
pub use handler::{Handler, HandlerOutcome, HandlerResult, ANONYMOUS_MODULE};
pub use logging::setup_logging;
pub use module::{FnModule, Module};
pub use utils::current_timestamp;
pub use value::{Map, Pattern, Value};

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, BusError>;
