//! Per-entity mutual exclusion.
//!
//! Card creation, dispute stage transitions, and budget read-modify-write
//! cycles each need a single writer per entity while unrelated entities stay
//! fully concurrent. [`KeyedLock`] hands out one async mutex per key and drops
//! idle slots on the next acquisition.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard held while the caller owns the entity.
pub type KeyedGuard = OwnedMutexGuard<()>;

/// Map of narrow, short-held async locks keyed by entity identifier.
#[derive(Debug)]
pub struct KeyedLock<K> {
    slots: Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>,
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Waits until `key` is free and returns a guard that owns it.
    pub async fn lock(&self, key: &K) -> KeyedGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Only the map itself references an idle slot.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        slot.lock_owned().await
    }

    /// Returns the number of keys currently held or awaited.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}

impl<K> Default for KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for KeyedLock<K> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}
