use basalt_query::{DeleteOptions, FindOptions};
use basalt_store::{Store, Transaction};
use bson::{Document, doc};

use crate::error::DbError;
use crate::result::{DeleteManyResult, DeleteOneResult};

use super::Collection;

impl<S: Store + Send + Sync + 'static> Collection<S> {
    /// Delete the first document matching the filter: index entries and
    /// the document key go in the same transaction, along with the
    /// decremented document count.
    pub fn delete_one(&self, filter: &Document) -> Result<DeleteOneResult, DbError> {
        self.index_manager().reload()?;
        let existing = self.find_one(filter)?;
        let id = Self::stored_id(&existing)?;

        let mut txn = self.store().begin()?;
        if let Err(e) = self.delete_document_in(&mut txn, &existing, &id) {
            let _ = txn.rollback();
            return Err(e);
        }
        let meta = match self.stage_count_delta(&mut txn, -1) {
            Ok(meta) => meta,
            Err(e) => {
                let _ = txn.rollback();
                return Err(e);
            }
        };
        self.commit_with_meta(txn, meta)?;

        Ok(DeleteOneResult { deleted_id: id })
    }

    /// Delete a document by its `_id`.
    pub fn delete_by_id(&self, id: &str) -> Result<DeleteOneResult, DbError> {
        self.delete_one(&doc! { "_id": id })
    }

    /// Delete every matched document (up to `options.limit`) in one
    /// transaction, removing each document's index entries alongside it.
    pub fn delete(
        &self,
        filter: &Document,
        options: &DeleteOptions,
    ) -> Result<DeleteManyResult, DbError> {
        self.index_manager().reload()?;

        let mut find_options = FindOptions::new();
        find_options.limit = options.limit;
        let matches = self.find(filter, &find_options)?.documents;
        if matches.is_empty() {
            return Ok(DeleteManyResult {
                deleted_ids: Vec::new(),
            });
        }

        let mut txn = self.store().begin()?;
        let mut deleted_ids = Vec::with_capacity(matches.len());
        for document in &matches {
            let id = match Self::stored_id(document) {
                Ok(id) => id,
                Err(e) => {
                    let _ = txn.rollback();
                    return Err(e);
                }
            };
            if let Err(e) = self.delete_document_in(&mut txn, document, &id) {
                let _ = txn.rollback();
                return Err(e);
            }
            deleted_ids.push(id);
        }
        let meta = match self.stage_count_delta(&mut txn, -(deleted_ids.len() as i64)) {
            Ok(meta) => meta,
            Err(e) => {
                let _ = txn.rollback();
                return Err(e);
            }
        };
        self.commit_with_meta(txn, meta)?;

        Ok(DeleteManyResult { deleted_ids })
    }

    fn delete_document_in(
        &self,
        txn: &mut S::Txn<'_>,
        document: &Document,
        id: &str,
    ) -> Result<(), DbError> {
        self.index_manager().unindex_document(txn, document)?;
        txn.delete(&self.doc_key(id))?;
        Ok(())
    }
}
