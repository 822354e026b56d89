//! Chime scheduler - integration test support.
//!
//! In-memory stand-ins for the event store and the chat host, plus fixtures
//! shared by the integration tests.

pub mod fixtures;
pub mod host;
pub mod store;

pub use host::{RecordingBroadcaster, RecordingMessenger};
pub use store::{MemoryEventStore, QueryGate};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex and recovers from poisoning.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
