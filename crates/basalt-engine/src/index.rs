use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use basalt_store::{Store, StoreError, Transaction};
use bson::Document;
use tracing::debug;

use crate::backfill::{self, BackfillHandle, CancelToken};
use crate::error::EngineError;
use crate::key;
use crate::lex::encode_lex;
use crate::metadata::{CollectionMetadata, ID_FIELD, IndexModel};

/// Catalog and maintenance engine for one collection's secondary indexes.
///
/// The in-memory metadata copy is an immutable snapshot behind an
/// [`ArcSwap`]: readers load the current `Arc` for the duration of a query,
/// writers persist first and swap after a successful commit, so a torn
/// declaration list is never observable.
pub struct IndexManager<S: Store> {
    store: Arc<S>,
    db_name: String,
    coll_name: String,
    metadata: ArcSwap<CollectionMetadata>,
    /// Indexes whose backfill has not committed yet. Hidden from the
    /// planner until they leave this set.
    building: Mutex<HashSet<String>>,
}

impl<S: Store> IndexManager<S> {
    pub fn new(store: Arc<S>, db_name: &str, coll_name: &str) -> Result<Self, EngineError> {
        let manager = Self {
            store,
            db_name: db_name.to_string(),
            coll_name: coll_name.to_string(),
            metadata: ArcSwap::new(Arc::new(CollectionMetadata::synthesized(coll_name))),
            building: Mutex::new(HashSet::new()),
        };
        manager.reload()?;
        Ok(manager)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn coll_name(&self) -> &str {
        &self.coll_name
    }

    fn meta_key(&self) -> Vec<u8> {
        key::collection_meta(&self.db_name, &self.coll_name)
    }

    // ── Metadata ────────────────────────────────────────────────

    /// Refresh the snapshot from storage. An absent record synthesizes
    /// default metadata with only the autogenerated `_id_` index.
    pub fn reload(&self) -> Result<(), EngineError> {
        let meta = match self.store.get(&self.meta_key()) {
            Ok(bytes) => bson::from_slice(&bytes)
                .map_err(|e| EngineError::Decoding(format!("collection metadata: {e}")))?,
            Err(StoreError::KeyNotFound) => CollectionMetadata::synthesized(&self.coll_name),
            Err(e) => return Err(e.into()),
        };
        self.metadata.store(Arc::new(meta));
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<CollectionMetadata> {
        self.metadata.load_full()
    }

    /// Current declaration list.
    pub fn list(&self) -> Vec<IndexModel> {
        self.snapshot().indexes.clone()
    }

    /// Declarations the planner may use: everything not still backfilling.
    pub fn planner_indexes(&self) -> Vec<IndexModel> {
        let building = self.building.lock().unwrap();
        self.snapshot()
            .indexes
            .iter()
            .filter(|idx| !building.contains(&idx.options.name))
            .cloned()
            .collect()
    }

    pub fn document_count(&self) -> i64 {
        self.snapshot().document_count
    }

    /// Write a metadata record into a transaction.
    pub fn persist<T: Transaction>(
        &self,
        txn: &mut T,
        meta: &CollectionMetadata,
    ) -> Result<(), EngineError> {
        let bytes =
            bson::to_vec(meta).map_err(|e| EngineError::Encoding(format!("metadata: {e}")))?;
        txn.put(&self.meta_key(), &bytes)?;
        Ok(())
    }

    /// Swap the in-memory snapshot. Call only after the transaction that
    /// persisted `meta` has committed.
    pub fn install(&self, meta: CollectionMetadata) {
        self.metadata.store(Arc::new(meta));
    }

    pub(crate) fn finish_building(&self, names: &[String]) {
        let mut building = self.building.lock().unwrap();
        for name in names {
            building.remove(name);
        }
    }

    // ── Entry construction ──────────────────────────────────────

    /// Build the entry key for `index` over `doc`.
    ///
    /// Returns `Ok(None)` when any indexed field is absent: sparse
    /// semantics, no entry is written for that document.
    pub fn entry_key(
        &self,
        index: &IndexModel,
        doc: &Document,
    ) -> Result<Option<Vec<u8>>, EngineError> {
        let doc_id = doc
            .get_str(ID_FIELD)
            .map_err(|_| EngineError::MissingFieldForIndex(ID_FIELD.to_string()))?;

        let mut values = Vec::with_capacity(index.fields.len());
        for field in &index.fields {
            match doc.get(&field.name) {
                Some(value) => values.push(encode_lex(value, field.order == -1)),
                None => return Ok(None),
            }
        }

        Ok(Some(key::index_entry(
            &self.db_name,
            &self.coll_name,
            &index.options.name,
            &index.fields_signature(),
            &values,
            doc_id,
        )))
    }

    // ── Uniqueness ──────────────────────────────────────────────

    /// Fail with [`EngineError::UniqueViolation`] when another document
    /// already occupies `doc`'s value tuple in any unique index.
    ///
    /// Runs against the mutation's own transaction so the check and the
    /// subsequent entry write are atomic. Documents missing a unique
    /// index's field are skipped; a sparse index holds no entry for them.
    pub fn check_uniqueness<T: Transaction>(
        &self,
        txn: &T,
        doc: &Document,
    ) -> Result<(), EngineError> {
        let candidate = doc
            .get_str(ID_FIELD)
            .map_err(|_| EngineError::MissingFieldForIndex(ID_FIELD.to_string()))?;

        for index in self.snapshot().indexes.iter().filter(|i| i.options.unique) {
            let mut values = Vec::with_capacity(index.fields.len());
            let mut complete = true;
            for field in &index.fields {
                match doc.get(&field.name) {
                    Some(value) => values.push(encode_lex(value, field.order == -1)),
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if !complete {
                continue;
            }

            let prefix = key::index_values_prefix(
                &self.db_name,
                &self.coll_name,
                &index.options.name,
                &index.fields_signature(),
                &values,
                true,
            );
            for entry in txn.scan_keys(&prefix)? {
                let holder = key::doc_id_from_index_entry(&entry);
                if holder.as_deref() != Some(candidate) {
                    return Err(EngineError::UniqueViolation(index.options.name.clone()));
                }
            }
        }

        Ok(())
    }

    // ── Entry maintenance ───────────────────────────────────────

    /// Write one entry per declared index that has all its fields present.
    pub fn index_document<T: Transaction>(
        &self,
        txn: &mut T,
        doc: &Document,
    ) -> Result<(), EngineError> {
        for index in &self.snapshot().indexes {
            if let Some(entry) = self.entry_key(index, doc)? {
                txn.put(&entry, &[])?;
            }
        }
        Ok(())
    }

    /// Delete the entries `index_document` would have written for `doc`.
    /// Called before a document's indexed values change or the document
    /// itself is removed.
    pub fn unindex_document<T: Transaction>(
        &self,
        txn: &mut T,
        doc: &Document,
    ) -> Result<(), EngineError> {
        for index in &self.snapshot().indexes {
            if let Some(entry) = self.entry_key(index, doc)? {
                txn.delete(&entry)?;
            }
        }
        Ok(())
    }

    // ── Entry scans ─────────────────────────────────────────────

    /// Entry keys whose value tuple starts with the equality values the
    /// filter provides, walking `index`'s fields in declaration order.
    /// With no leading equality value this degrades to the whole index.
    pub fn scan_entries(
        &self,
        index: &IndexModel,
        equality: &Document,
    ) -> Result<Vec<Vec<u8>>, EngineError> {
        let mut values = Vec::new();
        for field in &index.fields {
            match equality.get(&field.name) {
                Some(value) => values.push(encode_lex(value, field.order == -1)),
                None => break,
            }
        }

        if values.is_empty() {
            return self.scan_all_entries(index);
        }

        let exact = values.len() == index.fields.len();
        let prefix = key::index_values_prefix(
            &self.db_name,
            &self.coll_name,
            &index.options.name,
            &index.fields_signature(),
            &values,
            exact,
        );
        Ok(self.store.scan_keys(&prefix)?)
    }

    /// Every entry key of `index`, in key (= index) order.
    pub fn scan_all_entries(&self, index: &IndexModel) -> Result<Vec<Vec<u8>>, EngineError> {
        let prefix = key::index_field_prefix(
            &self.db_name,
            &self.coll_name,
            &index.options.name,
            &index.fields_signature(),
        );
        Ok(self.store.scan_keys(&prefix)?)
    }
}

impl<S: Store + Send + Sync + 'static> IndexManager<S> {
    /// Validate and register new index declarations, then start a
    /// background backfill over the existing documents.
    ///
    /// Declarations without a name get the deterministic default
    /// (`field1_1_field2_-1_...`). A name or field-set collision with a
    /// non-autogenerated index is rejected; colliding with an
    /// autogenerated one (the implicit `_id_`) upgrades it in place.
    ///
    /// The new indexes stay invisible to the planner until the backfill
    /// commits. The returned handle can be used to await completion;
    /// dropping it detaches the task.
    pub fn create_many(
        self: &Arc<Self>,
        declarations: Vec<IndexModel>,
        cancel: CancelToken,
    ) -> Result<Option<BackfillHandle>, EngineError> {
        if declarations.is_empty() {
            return Ok(None);
        }

        self.reload()?;
        let mut meta = (*self.snapshot()).clone();
        let mut created: Vec<IndexModel> = Vec::new();
        let mut replaced: Vec<IndexModel> = Vec::new();

        for mut decl in declarations {
            decl.validate()?;
            let trimmed = decl.options.name.trim().to_string();
            decl.options.name = if trimmed.is_empty() {
                decl.default_name()
            } else {
                trimmed
            };
            decl.options.autogenerated = false;

            let mut upgrade_at = None;
            for (i, existing) in meta.indexes.iter().enumerate() {
                let collides = existing.options.name == decl.options.name
                    || existing.same_field_set(&decl);
                if !collides {
                    continue;
                }
                if existing.options.autogenerated {
                    upgrade_at = Some(i);
                    break;
                }
                return Err(EngineError::IndexAlreadyExists(decl.options.name.clone()));
            }

            match upgrade_at {
                Some(i) => {
                    replaced.push(meta.indexes[i].clone());
                    meta.indexes[i] = decl.clone();
                }
                None => meta.indexes.push(decl.clone()),
            }
            created.push(decl);
        }

        let mut txn = self.store.begin()?;
        self.persist(&mut txn, &meta)?;
        txn.commit()?;
        self.install(meta);

        {
            let mut building = self.building.lock().unwrap();
            for index in &created {
                building.insert(index.options.name.clone());
            }
        }

        debug!(
            collection = %self.coll_name,
            indexes = created.len(),
            "registered indexes, starting backfill"
        );
        Ok(Some(backfill::spawn(
            Arc::clone(self),
            created,
            replaced,
            cancel,
        )))
    }
}
