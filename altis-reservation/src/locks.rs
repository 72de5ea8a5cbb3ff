use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Lazily created mutex per flight number.
///
/// Operations on one flight serialize on that flight's mutex; different
/// flights never contend beyond the brief registry lookup.
#[derive(Default)]
pub struct FlightLockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FlightLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex for `flight_number`, created on first access.
    pub fn lock_for(&self, flight_number: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(lock) = locks.get(flight_number) {
            return lock.clone();
        }

        debug!("Creating lock for flight {}", flight_number);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(flight_number.to_string(), lock.clone());
        lock
    }

    /// Runs `f` while holding the flight's mutex.
    pub fn with_flight<T>(&self, flight_number: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(flight_number);
        // Poisoning is ignored: mutations are staged on a copy and only the
        // store commits them.
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
