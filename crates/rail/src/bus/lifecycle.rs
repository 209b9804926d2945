//! Module attach/detach

use super::core::Bus;
use super::{MODULE_ATTACHED, MODULE_DETACHED};
use crate::error::BusError;
use crate::module::Module;
use crate::utils::panic_to_error;
use crate::value::Value;
use dashmap::mapref::entry::Entry;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A module recorded as attached.
pub(crate) struct ModuleEntry {
    module: Arc<dyn Module>,
    /// Attach sequence, used to report modules in attach order
    order: u64,
    detaching: AtomicBool,
}

impl Bus {
    /// Attaches a module and runs its `connect` hook.
    ///
    /// The module is recorded before `connect` runs, so the hook can already see it.
    /// If `connect` fails or panics, the module and every listener it registered are
    /// removed again. On success a `rail.module.attached` event is emitted.
    ///
    /// # Arguments
    ///
    /// * `module` - The module to attach; its name must be unique on this bus
    ///
    /// # Returns
    ///
    /// The bus itself, so attaches can be chained. Fails with
    /// [`BusError::InvalidModule`] for a blank name, [`BusError::DuplicateModule`]
    /// if the name is taken and [`BusError::ConnectionFailed`] if `connect` failed.
    pub fn attach<M: Module>(&self, module: M) -> Result<&Self, BusError> {
        self.attach_shared(Arc::new(module))
    }

    /// Same as [`attach`](Self::attach) for modules that are already shared.
    pub fn attach_shared(&self, module: Arc<dyn Module>) -> Result<&Self, BusError> {
        let name = module.name().to_string();
        if name.trim().is_empty() {
            return Err(BusError::InvalidModule(
                "module name must be a non-empty string".to_string(),
            ));
        }

        match self.inner.modules.entry(name.clone()) {
            Entry::Occupied(_) => {
                warn!("⚠️ Module already attached: {}", name);
                return Err(BusError::DuplicateModule(name));
            }
            Entry::Vacant(slot) => {
                slot.insert(ModuleEntry {
                    module: module.clone(),
                    order: self.inner.module_order.fetch_add(1, Ordering::Relaxed),
                    detaching: AtomicBool::new(false),
                });
            }
        }

        let connected = catch_unwind(AssertUnwindSafe(|| module.connect(self)))
            .unwrap_or_else(|panic_info| Err(panic_to_error(panic_info)));

        if let Err(e) = connected {
            self.inner.modules.remove(&name);
            let dropped = self.inner.registry.unregister_by_module(&name);
            error!("❌ Module {} failed to connect ({} listeners rolled back): {}", name, dropped, e);
            return Err(BusError::ConnectionFailed {
                module: name,
                message: e.message().to_string(),
            });
        }

        info!("🔌 Module attached: {}", name);
        self.emit(MODULE_ATTACHED, Value::object_from([("name", name)]));
        Ok(self)
    }

    /// Detaches a module.
    ///
    /// Removes exactly the listeners owned by the module, then runs its `disconnect`
    /// hook. A failing hook is logged and the detach still completes. Returns `false`
    /// if no module with that name is attached.
    pub fn detach(&self, name: &str) -> bool {
        let module = match self.inner.modules.get(name) {
            Some(entry) if !entry.detaching.swap(true, Ordering::AcqRel) => entry.module.clone(),
            _ => return false,
        };

        let removed = self.inner.registry.unregister_by_module(name);
        bus_trace!(self, module = name, removed, "Listeners removed for module");

        let disconnected = catch_unwind(AssertUnwindSafe(|| module.disconnect(self)))
            .unwrap_or_else(|panic_info| Err(panic_to_error(panic_info)));
        if let Err(e) = disconnected {
            error!("❌ Module {} failed to disconnect cleanly: {}", name, e);
        }

        self.inner.modules.remove(name);
        info!("🛑 Module detached: {}", name);
        self.emit(MODULE_DETACHED, Value::object_from([("name", name)]));
        true
    }

    /// Names of attached modules, in attach order.
    pub fn get_modules(&self) -> Vec<String> {
        let mut modules: Vec<(u64, String)> = self
            .inner
            .modules
            .iter()
            .map(|entry| (entry.value().order, entry.key().clone()))
            .collect();
        modules.sort_unstable_by_key(|(order, _)| *order);
        modules.into_iter().map(|(_, name)| name).collect()
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.inner.modules.contains_key(name)
    }
}
