//! Synchronisation primitives used by the generation machinery.
//!
//! Everything that readers and the writer race on goes through this module so
//! the `loom` feature can swap in model-checked equivalents. Copy-on-write
//! storage segments are plain data and keep using `std::sync::Arc`.

#[cfg(feature = "loom")]
pub(crate) use loom::cell::Cell;
#[cfg(not(feature = "loom"))]
pub(crate) use std::cell::Cell;

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

#[cfg(feature = "loom")]
pub(crate) use loom::sync::Arc;
#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::Arc;

#[cfg(not(feature = "loom"))]
pub(crate) use antidote::Mutex;

/// Poison-free mutex over `loom::sync::Mutex`, matching the `antidote` API.
#[cfg(feature = "loom")]
#[derive(Debug, Default)]
pub(crate) struct Mutex<T>(loom::sync::Mutex<T>);

#[cfg(feature = "loom")]
impl<T> Mutex<T> {
    pub(crate) fn new(t: T) -> Self {
        Self(loom::sync::Mutex::new(t))
    }

    pub(crate) fn lock(&self) -> loom::sync::MutexGuard<'_, T> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
