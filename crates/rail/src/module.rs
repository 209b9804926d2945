//! Module definitions
//!
//! A module is a named unit of application logic. It usually registers its listeners
//! from `connect` (passing its own name so the bus can tie them to it) and releases
//! external resources from `disconnect`. Both hooks are optional.

use crate::bus::Bus;
use crate::error::HandlerError;
use std::fmt;

/// Trait implemented by everything that can be attached to a [`Bus`].
pub trait Module: Send + Sync + 'static {
    /// Unique name of this module on the bus
    fn name(&self) -> &str;

    /// Called once after the module is recorded as attached.
    ///
    /// An error rolls the attach back.
    fn connect(&self, _bus: &Bus) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called once while the module is being detached.
    ///
    /// An error is logged and the detach still completes.
    fn disconnect(&self, _bus: &Bus) -> Result<(), HandlerError> {
        Ok(())
    }
}

type Hook = Box<dyn Fn(&Bus) -> Result<(), HandlerError> + Send + Sync>;

/// A module assembled from closures.
///
/// ```rust,no_run
/// use rail::{Bus, FnModule, Handler, Value};
///
/// let bus = Bus::default();
/// bus.attach(FnModule::new("audit").on_connect(|bus| {
///     bus.on_module("user.created", "audit", Handler::sync(|payload: Value| {
///         tracing::info!(?payload, "user created");
///         Ok(Value::Undefined)
///     }))?;
///     Ok(())
/// }))?;
/// # Ok::<(), rail::BusError>(())
/// ```
pub struct FnModule {
    name: String,
    connect: Option<Hook>,
    disconnect: Option<Hook>,
}

impl FnModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connect: None,
            disconnect: None,
        }
    }

    pub fn on_connect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Bus) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.connect = Some(Box::new(hook));
        self
    }

    pub fn on_disconnect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Bus) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.disconnect = Some(Box::new(hook));
        self
    }
}

impl Module for FnModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&self, bus: &Bus) -> Result<(), HandlerError> {
        match &self.connect {
            Some(hook) => hook(bus),
            None => Ok(()),
        }
    }

    fn disconnect(&self, bus: &Bus) -> Result<(), HandlerError> {
        match &self.disconnect {
            Some(hook) => hook(bus),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for FnModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModule")
            .field("name", &self.name)
            .field("connect", &self.connect.is_some())
            .field("disconnect", &self.disconnect.is_some())
            .finish()
    }
}
