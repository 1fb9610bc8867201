use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock the collection state, recovering the guard if a holder panicked.
pub(crate) fn state_lock<'a, T>(lock: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                target = "lightfield::application::sync",
                op,
                result = "poisoned_recovered",
                hint = "collection state may be stale after panic in another task",
                "Recovered from poisoned collection lock"
            );
            poisoned.into_inner()
        }
    }
}
