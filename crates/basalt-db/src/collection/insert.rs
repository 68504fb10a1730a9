use basalt_engine::ID_INDEX_NAME;
use basalt_store::{Store, Transaction};
use bson::Document;
use tracing::debug;

use crate::error::DbError;
use crate::result::{InsertManyResult, InsertOneResult};

use super::Collection;

/// Bulk inserts run in fixed-size batches, one transaction per batch.
const INSERT_BATCH_SIZE: usize = 100;

impl<S: Store + Send + Sync + 'static> Collection<S> {
    /// Insert a single document inside one transaction: uniqueness check,
    /// document write, index entries, document count.
    pub fn insert_one(&self, doc: Document) -> Result<InsertOneResult, DbError> {
        self.index_manager().reload()?;
        let mut txn = self.store().begin()?;

        let inserted_id = match self.insert_one_in(&mut txn, doc) {
            Ok(id) => id,
            Err(e) => {
                let _ = txn.rollback();
                return Err(e);
            }
        };
        let meta = match self.stage_count_delta(&mut txn, 1) {
            Ok(meta) => meta,
            Err(e) => {
                let _ = txn.rollback();
                return Err(e);
            }
        };
        self.commit_with_meta(txn, meta)?;

        Ok(InsertOneResult { inserted_id })
    }

    /// Insert documents in batches of `INSERT_BATCH_SIZE`, one transaction
    /// per batch. A failing batch is rolled back and the error returned;
    /// batches committed before it are not rewound.
    pub fn insert(&self, docs: Vec<Document>) -> Result<InsertManyResult, DbError> {
        if docs.is_empty() {
            return Err(DbError::EmptyDocumentList);
        }
        self.index_manager().reload()?;

        let mut remaining = docs;
        let mut inserted_ids = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let take = remaining.len().min(INSERT_BATCH_SIZE);
            let batch: Vec<Document> = remaining.drain(..take).collect();

            let mut txn = self.store().begin()?;
            let mut batch_ids = Vec::with_capacity(batch.len());
            for doc in batch {
                match self.insert_one_in(&mut txn, doc) {
                    Ok(id) => batch_ids.push(id),
                    Err(e) => {
                        let _ = txn.rollback();
                        return Err(e);
                    }
                }
            }
            let meta = match self.stage_count_delta(&mut txn, batch_ids.len() as i64) {
                Ok(meta) => meta,
                Err(e) => {
                    let _ = txn.rollback();
                    return Err(e);
                }
            };
            self.commit_with_meta(txn, meta)?;
            inserted_ids.extend(batch_ids);
        }

        debug!(
            collection = %self.name(),
            inserted = inserted_ids.len(),
            "bulk insert committed"
        );
        Ok(InsertManyResult { inserted_ids })
    }

    /// The per-document insert path, shared with upsert.
    pub(crate) fn insert_one_in(
        &self,
        txn: &mut S::Txn<'_>,
        mut doc: Document,
    ) -> Result<String, DbError> {
        let id = Self::ensure_document_id(&mut doc)?;

        // An existing document under the same key is an `_id_` conflict:
        // the unique-index scan below cannot see it because both entries
        // carry the same doc-id segment.
        let key = self.doc_key(&id);
        if txn.get(&key).is_ok() {
            return Err(DbError::UniqueViolation(ID_INDEX_NAME.to_string()));
        }

        self.index_manager().check_uniqueness(txn, &doc)?;

        let bytes = bson::to_vec(&doc).map_err(|e| DbError::Encoding(e.to_string()))?;
        txn.put(&key, &bytes)?;
        self.index_manager().index_document(txn, &doc)?;

        Ok(id)
    }
}
