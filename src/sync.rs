//! Lock helpers shared by stores and services.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Acquires a mutex, recovering the inner value if a previous holder panicked.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("mutex was poisoned, recovering");
            metrics::counter!("mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Read-locks an `RwLock` with poison recovery.
pub fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("rwlock was poisoned, recovering");
            metrics::counter!("mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Write-locks an `RwLock` with poison recovery.
pub fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("rwlock was poisoned, recovering");
            metrics::counter!("mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Entries kept before idle per-key locks are pruned.
const PRUNE_THRESHOLD: usize = 1_024;

/// A lazily populated set of per-key mutexes.
///
/// Serializes read-modify-write cycles on one key without blocking other keys.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Creates an empty lock set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `key`, creating it on first use.
    pub fn get(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = acquire_lock(&self.locks);
        if locks.len() > PRUNE_THRESHOLD {
            // Only this map holds idle locks.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        acquire_lock(&self.locks).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    #[allow(clippy::panic)]
    fn test_acquire_lock_recovers_from_poison() {
        let mutex = Arc::new(Mutex::new(1));
        let clone = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert!(mutex.is_poisoned());
        assert_eq!(*acquire_lock(&mutex), 1);
    }

    #[test]
    fn test_keyed_locks_share_per_key() {
        let locks = KeyedLocks::new();
        let a1 = locks.get("a");
        let a2 = locks.get("a");
        let b = locks.get("b");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn test_keyed_locks_serialize_updates() {
        let locks = Arc::new(KeyedLocks::new());
        let counter = Arc::new(Mutex::new(0u32));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let lock = locks.get("entry");
                        let _held = acquire_lock(&lock);
                        let value = *acquire_lock(&counter);
                        *acquire_lock(&counter) = value + 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*acquire_lock(&counter), 800);
        assert_eq!(locks.len(), 1);
    }
}
