use std::sync::Arc;

use basalt_store::Store;

use crate::collection::Collection;
use crate::error::DbError;

/// Entry point: owns the shared store handle.
///
/// Databases are implicit namespaces: they exist as soon as a collection
/// under them holds data, and opening one never touches storage.
pub struct Client<S: Store> {
    store: Arc<S>,
}

impl<S: Store + Send + Sync + 'static> Client<S> {
    pub fn open(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn database(&self, name: &str) -> Database<S> {
        Database {
            store: Arc::clone(&self.store),
            name: name.to_string(),
        }
    }

    /// Direct access to the underlying store, for tooling and tests that
    /// need to inspect the raw keyspace.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Flush and release the backing store. Collections obtained from this
    /// client fail on first storage access afterwards.
    pub fn close(&self) -> Result<(), DbError> {
        self.store.close()?;
        Ok(())
    }
}

/// A named namespace of collections.
pub struct Database<S: Store> {
    store: Arc<S>,
    name: String,
}

impl<S: Store + Send + Sync + 'static> Database<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a collection handle, loading its metadata (or synthesizing
    /// the default record when none is persisted yet).
    pub fn collection(&self, name: &str) -> Result<Collection<S>, DbError> {
        Collection::open(Arc::clone(&self.store), &self.name, name)
    }
}
