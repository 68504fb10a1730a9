use basalt_engine::ID_FIELD;
use basalt_query::UpdateOptions;
use basalt_store::{Store, Transaction};
use bson::Document;

use crate::error::DbError;
use crate::result::{UpdateManyResult, UpdateOneResult};

use super::Collection;

impl<S: Store + Send + Sync + 'static> Collection<S> {
    /// Update the first document matching the filter.
    ///
    /// With `set` the caller's fields replace the stored document; without
    /// it they are merged on top. With `upsert` a missing target turns the
    /// operation into an insert of the caller's document. Old index
    /// entries are removed before the overwrite so changed values cannot
    /// leak stale keys.
    pub fn update_one(
        &self,
        filter: &Document,
        doc: Document,
        options: &UpdateOptions,
    ) -> Result<UpdateOneResult, DbError> {
        self.index_manager().reload()?;
        let mut txn = self.store().begin()?;
        let mut count_delta = 0i64;

        let outcome = match self.update_one_in(&mut txn, filter, doc, options, &mut count_delta) {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = txn.rollback();
                return Err(e);
            }
        };
        let meta = match self.stage_count_delta(&mut txn, count_delta) {
            Ok(meta) => meta,
            Err(e) => {
                let _ = txn.rollback();
                return Err(e);
            }
        };
        self.commit_with_meta(txn, meta)?;

        Ok(outcome)
    }

    /// Apply each caller document through the same filter inside one
    /// transaction; the first failure rolls back the entire batch.
    pub fn update(
        &self,
        filter: &Document,
        docs: Vec<Document>,
        options: &UpdateOptions,
    ) -> Result<UpdateManyResult, DbError> {
        if docs.is_empty() {
            return Err(DbError::EmptyDocumentList);
        }
        self.index_manager().reload()?;
        let mut txn = self.store().begin()?;
        let mut count_delta = 0i64;
        let mut modified_ids = Vec::new();
        let mut upserted_ids = Vec::new();

        for doc in docs {
            match self.update_one_in(&mut txn, filter, doc, options, &mut count_delta) {
                Ok(outcome) => {
                    modified_ids.extend(outcome.modified_id);
                    upserted_ids.extend(outcome.upserted_id);
                }
                Err(e) => {
                    let _ = txn.rollback();
                    return Err(e);
                }
            }
        }
        let meta = match self.stage_count_delta(&mut txn, count_delta) {
            Ok(meta) => meta,
            Err(e) => {
                let _ = txn.rollback();
                return Err(e);
            }
        };
        self.commit_with_meta(txn, meta)?;

        Ok(UpdateManyResult {
            modified_ids,
            upserted_ids,
        })
    }

    fn update_one_in(
        &self,
        txn: &mut S::Txn<'_>,
        filter: &Document,
        doc: Document,
        options: &UpdateOptions,
        count_delta: &mut i64,
    ) -> Result<UpdateOneResult, DbError> {
        let existing = match self.find_one(filter) {
            Ok(found) => found,
            Err(DbError::DocumentNotFound) if options.upsert => {
                let id = self.insert_one_in(txn, doc)?;
                *count_delta += 1;
                return Ok(UpdateOneResult {
                    modified_id: None,
                    upserted_id: Some(id),
                });
            }
            Err(e) => return Err(e),
        };

        let id = Self::stored_id(&existing)?;
        let new_doc = if options.set {
            let mut replacement = doc;
            replacement.insert(ID_FIELD, id.clone());
            replacement
        } else {
            let mut merged = existing.clone();
            for (field, value) in doc {
                if field == ID_FIELD {
                    continue;
                }
                merged.insert(field, value);
            }
            merged
        };

        // Drop the old entries first: with them gone, the uniqueness scan
        // inside this transaction sees only other documents' entries.
        self.index_manager().unindex_document(txn, &existing)?;
        self.index_manager().check_uniqueness(txn, &new_doc)?;

        let bytes = bson::to_vec(&new_doc).map_err(|e| DbError::Encoding(e.to_string()))?;
        txn.put(&self.doc_key(&id), &bytes)?;
        self.index_manager().index_document(txn, &new_doc)?;

        Ok(UpdateOneResult {
            modified_id: Some(id),
            upserted_id: None,
        })
    }
}
