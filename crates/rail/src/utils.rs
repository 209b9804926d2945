//! Utility functions

use crate::error::HandlerError;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Current Unix timestamp in milliseconds.
pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Read-lock that recovers the data if a previous holder panicked.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write-lock that recovers the data if a previous holder panicked.
pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Mutex lock that recovers the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Converts a caught panic into a handler failure.
pub(crate) fn panic_to_error(panic_info: Box<dyn std::any::Any + Send>) -> HandlerError {
    let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked with unknown error".to_string()
    };

    HandlerError::new(message)
}
