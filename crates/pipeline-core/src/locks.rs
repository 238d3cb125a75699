//! Per-component mutual exclusion for read-check-write sequences.
//!
//! Entries exist only while some caller holds or waits on them, so the
//! registry stays bounded by the number of in-flight components.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// One mutex per component id; different ids never contend.
#[derive(Debug, Default)]
pub struct ComponentLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ComponentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, component_id: &str) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(component_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the registry entry once no other caller shares `lock`.
    fn release(&self, component_id: &str, lock: Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            slots.remove(component_id);
        }
    }

    /// Run `f` while holding the lock for `component_id`.
    pub fn with_lock<T>(&self, component_id: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(component_id);
        let out = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(component_id, lock);
        out
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
