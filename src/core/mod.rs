// src/core/mod.rs

pub mod combo;
pub mod net;
pub mod pause;
pub mod range;

pub use combo::AttributeCombo;
pub use pause::Pacer;
pub use range::RangeDescriptor;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock, recovering the data if another worker panicked while holding it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
