mod delete;
mod find;
mod insert;
mod update;

use std::sync::Arc;

use basalt_engine::{
    BackfillHandle, CancelToken, ID_FIELD, IndexManager, IndexModel, key,
};
use basalt_store::{Store, StoreError, Transaction};
use bson::{Bson, Document};

use crate::error::DbError;

/// A named set of documents plus its index manager.
///
/// All mutations run inside a single storage transaction covering the
/// document write, its index side-effects, and the metadata record; any
/// error rolls the transaction back and the in-memory metadata snapshot
/// is only swapped after a successful commit.
pub struct Collection<S: Store> {
    db_name: String,
    name: String,
    store: Arc<S>,
    indexes: Arc<IndexManager<S>>,
}

impl<S: Store + Send + Sync + 'static> Collection<S> {
    pub(crate) fn open(store: Arc<S>, db_name: &str, name: &str) -> Result<Self, DbError> {
        let indexes = Arc::new(IndexManager::new(Arc::clone(&store), db_name, name)?);
        Ok(Self {
            db_name: db_name.to_string(),
            name: name.to_string(),
            store,
            indexes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Number of documents, as maintained by committed mutations.
    pub fn count(&self) -> Result<i64, DbError> {
        self.indexes.reload()?;
        Ok(self.indexes.document_count())
    }

    // ── Index administration ────────────────────────────────────

    /// Declare one index. See [`Collection::create_many_indexes`].
    pub fn create_index(&self, index: IndexModel) -> Result<Option<BackfillHandle>, DbError> {
        self.create_many_indexes(vec![index])
    }

    /// Declare indexes and start their background backfill. The returned
    /// handle can be awaited; the planner ignores the new indexes until
    /// the backfill commits.
    pub fn create_many_indexes(
        &self,
        indexes: Vec<IndexModel>,
    ) -> Result<Option<BackfillHandle>, DbError> {
        self.create_many_indexes_with_cancel(indexes, CancelToken::never())
    }

    /// Like [`Collection::create_many_indexes`] with a caller-supplied
    /// cancellation token for the backfill.
    pub fn create_many_indexes_with_cancel(
        &self,
        indexes: Vec<IndexModel>,
        cancel: CancelToken,
    ) -> Result<Option<BackfillHandle>, DbError> {
        Ok(self.indexes.create_many(indexes, cancel)?)
    }

    pub fn list_indexes(&self) -> Result<Vec<IndexModel>, DbError> {
        self.indexes.reload()?;
        Ok(self.indexes.list())
    }

    // ── Shared internals ────────────────────────────────────────

    pub(crate) fn index_manager(&self) -> &Arc<IndexManager<S>> {
        &self.indexes
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) fn doc_key(&self, id: &str) -> Vec<u8> {
        key::document(&self.db_name, &self.name, id)
    }

    /// Point read of a stored document. `KeyNotFound` is promoted to
    /// [`DbError::DocumentNotFound`] here, at the executor boundary.
    pub(crate) fn read_document(&self, id: &str) -> Result<Document, DbError> {
        let bytes = match self.store.get(&self.doc_key(id)) {
            Ok(bytes) => bytes,
            Err(StoreError::KeyNotFound) => return Err(DbError::DocumentNotFound),
            Err(e) => return Err(e.into()),
        };
        bson::from_slice(&bytes).map_err(|e| DbError::Decoding(e.to_string()))
    }

    /// Return the document's `_id`, assigning a fresh UUIDv4 when it is
    /// absent or an empty string. Any other non-string value is rejected.
    pub(crate) fn ensure_document_id(doc: &mut Document) -> Result<String, DbError> {
        match doc.get(ID_FIELD) {
            Some(Bson::String(id)) if !id.is_empty() => return Ok(id.clone()),
            Some(Bson::String(_)) | None => {}
            Some(_) => {
                return Err(DbError::InvalidDocument("_id must be a string".to_string()));
            }
        }
        let id = uuid::Uuid::new_v4().to_string();
        doc.insert(ID_FIELD, id.clone());
        Ok(id)
    }

    /// Extract the `_id` of a stored document.
    pub(crate) fn stored_id(doc: &Document) -> Result<String, DbError> {
        doc.get_str(ID_FIELD)
            .map(str::to_string)
            .map_err(|_| DbError::Decoding("stored document has no string _id".to_string()))
    }

    /// Commit, mapping storage rejection to [`DbError::CommitFailed`],
    /// then swap in the updated metadata snapshot.
    pub(crate) fn commit_with_meta(
        &self,
        txn: S::Txn<'_>,
        meta: basalt_engine::CollectionMetadata,
    ) -> Result<(), DbError> {
        txn.commit().map_err(|e| DbError::CommitFailed(e.to_string()))?;
        self.indexes.install(meta);
        Ok(())
    }

    /// Stage a document-count change into the transaction's metadata
    /// record. The returned copy must be installed after commit.
    pub(crate) fn stage_count_delta(
        &self,
        txn: &mut S::Txn<'_>,
        delta: i64,
    ) -> Result<basalt_engine::CollectionMetadata, DbError> {
        let mut meta = (*self.indexes.snapshot()).clone();
        meta.document_count += delta;
        self.indexes.persist(txn, &meta)?;
        Ok(meta)
    }
}
