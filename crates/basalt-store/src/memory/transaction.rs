use std::sync::MutexGuard;

use crate::error::StoreError;
use crate::store::Transaction;

use super::{Keyspace, MemoryStore, scan_map};

/// Write transaction over a [`MemoryStore`].
///
/// Holds the store's write lock for its whole lifetime, so at most one
/// write transaction exists at a time and a commit can never observe a
/// conflicting concurrent write. The working copy starts as the committed
/// snapshot; reads see the transaction's own uncommitted writes.
pub struct MemoryTransaction<'a> {
    working: Keyspace,
    store: &'a MemoryStore,
    _write_guard: MutexGuard<'a, ()>,
}

impl<'a> MemoryTransaction<'a> {
    pub(crate) fn new(store: &'a MemoryStore, guard: MutexGuard<'a, ()>) -> Self {
        Self {
            working: (*store.snapshot()).clone(),
            store,
            _write_guard: guard,
        }
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.working
            .get(key)
            .cloned()
            .ok_or(StoreError::KeyNotFound)
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(scan_map(&self.working, prefix))
    }

    fn scan_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        Ok(self
            .working
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.store.check_open()?;
        self.working.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.store.check_open()?;
        self.working.remove(key);
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.store.check_open()?;
        self.store.publish(self.working);
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
