mod transaction;

pub use transaction::MemoryTransaction;

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use imbl::OrdMap;
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::Store;

pub(crate) type Keyspace = OrdMap<Vec<u8>, Vec<u8>>;

/// In-memory ordered store backed by a persistent map.
///
/// The committed state is a single immutable [`OrdMap`] published through an
/// [`ArcSwap`]. Readers load the current snapshot without locking; a write
/// transaction holds `write_lock` for its whole lifetime, so writers are
/// serialized and commits can never conflict.
pub struct MemoryStore {
    data: ArcSwap<Keyspace>,
    write_lock: Mutex<()>,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            data: ArcSwap::new(Arc::new(OrdMap::new())),
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> Arc<Keyspace> {
        self.data.load_full()
    }

    pub(crate) fn publish(&self, data: Keyspace) {
        self.data.store(Arc::new(data));
    }

    fn with_write<T>(
        &self,
        apply: impl FnOnce(&mut Keyspace) -> T,
    ) -> Result<T, StoreError> {
        self.check_open()?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("write lock poisoned: {e}")))?;
        let mut data = (*self.data.load_full()).clone();
        let out = apply(&mut data);
        self.publish(data);
        Ok(out)
    }
}

impl Store for MemoryStore {
    type Txn<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> Result<Self::Txn<'_>, StoreError> {
        self.check_open()?;
        let guard = self
            .write_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("write lock poisoned: {e}")))?;
        Ok(MemoryTransaction::new(self, guard))
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.check_open()?;
        self.snapshot()
            .get(key)
            .cloned()
            .ok_or(StoreError::KeyNotFound)
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.check_open()?;
        Ok(scan_map(&self.snapshot(), prefix))
    }

    fn scan_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        self.check_open()?;
        let snapshot = self.snapshot();
        Ok(snapshot
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn stream(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<(), StoreError> {
        self.check_open()?;
        let snapshot = self.snapshot();
        for (k, v) in snapshot
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            if !visit(k, v) {
                break;
            }
        }
        Ok(())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.with_write(|data| {
            data.insert(key.to_vec(), value.to_vec());
        })
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.with_write(|data| {
            data.remove(key);
        })
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

pub(crate) fn scan_map(data: &Keyspace, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    data.range(prefix.to_vec()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
