use std::cell::Cell;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use basalt_store::{Store, Transaction};
use bson::Document;
use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::index::IndexManager;
use crate::key;
use crate::metadata::IndexModel;

/// Caller side of a cancellation pair. Signalling is one-shot and
/// best-effort; the backfill checks between documents.
pub struct CancelHandle {
    tx: Sender<()>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Cancellation token handed to a backfill task.
pub struct CancelToken {
    rx: Option<Receiver<()>>,
    hit: Cell<bool>,
}

impl CancelToken {
    /// A connected handle/token pair.
    pub fn channel() -> (CancelHandle, CancelToken) {
        let (tx, rx) = bounded(1);
        (
            CancelHandle { tx },
            CancelToken {
                rx: Some(rx),
                hit: Cell::new(false),
            },
        )
    }

    /// A token that can never fire.
    pub fn never() -> CancelToken {
        CancelToken {
            rx: None,
            hit: Cell::new(false),
        }
    }

    /// Sticky: once observed cancelled, stays cancelled.
    pub fn is_cancelled(&self) -> bool {
        if self.hit.get() {
            return true;
        }
        let cancelled = self.rx.as_ref().is_some_and(|rx| rx.try_recv().is_ok());
        if cancelled {
            self.hit.set(true);
        }
        cancelled
    }
}

/// Handle to a running backfill task.
///
/// Dropping the handle detaches the task; [`BackfillHandle::wait`] blocks
/// until it finishes (committed, cancelled, or failed).
#[derive(Debug)]
pub struct BackfillHandle {
    thread: JoinHandle<()>,
    index_names: Vec<String>,
}

impl BackfillHandle {
    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    pub fn wait(self) {
        let _ = self.thread.join();
    }
}

/// Start the backfill for freshly created indexes on a detached thread.
///
/// `replaced` lists declarations the creation displaced (an upgraded
/// autogenerated index); their stale entries are purged in the same
/// transaction that writes the new ones. Errors and cancellation roll the
/// transaction back and leave the new indexes out of the planner's
/// candidate set for the process lifetime.
pub(crate) fn spawn<S>(
    manager: Arc<IndexManager<S>>,
    new_indexes: Vec<IndexModel>,
    replaced: Vec<IndexModel>,
    token: CancelToken,
) -> BackfillHandle
where
    S: Store + Send + Sync + 'static,
{
    let index_names: Vec<String> = new_indexes
        .iter()
        .map(|i| i.options.name.clone())
        .collect();
    let names = index_names.clone();

    let thread = thread::spawn(move || {
        match run(&manager, &new_indexes, &replaced, &token) {
            Ok(true) => {
                manager.finish_building(&names);
                debug!(indexes = ?names, "index backfill committed");
            }
            Ok(false) => warn!(indexes = ?names, "index backfill cancelled"),
            Err(e) => warn!(indexes = ?names, error = %e, "index backfill failed"),
        }
    });

    BackfillHandle {
        thread,
        index_names,
    }
}

/// One transaction: purge replaced-index entries, then write an entry per
/// (existing document, new index) pair. Returns `Ok(false)` on cancellation.
fn run<S: Store>(
    manager: &IndexManager<S>,
    new_indexes: &[IndexModel],
    replaced: &[IndexModel],
    token: &CancelToken,
) -> Result<bool, EngineError> {
    let mut txn = manager.store().begin()?;

    for index in replaced {
        let prefix = key::index_field_prefix(
            manager.db_name(),
            manager.coll_name(),
            &index.options.name,
            &index.fields_signature(),
        );
        for entry in txn.scan_keys(&prefix)? {
            txn.delete(&entry)?;
        }
    }

    let prefix = key::document_prefix(manager.db_name(), manager.coll_name());
    let mut cancelled = false;
    let mut failure: Option<EngineError> = None;

    manager.store().stream(&prefix, &mut |_, value| {
        if token.is_cancelled() {
            cancelled = true;
            return false;
        }
        let doc: Document = match bson::from_slice(value) {
            Ok(doc) => doc,
            Err(e) => {
                failure = Some(EngineError::Decoding(e.to_string()));
                return false;
            }
        };
        for index in new_indexes {
            match manager.entry_key(index, &doc) {
                Ok(Some(entry)) => {
                    if let Err(e) = txn.put(&entry, &[]) {
                        failure = Some(e.into());
                        return false;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    failure = Some(e);
                    return false;
                }
            }
        }
        true
    })?;

    if let Some(e) = failure {
        txn.rollback()?;
        return Err(e);
    }
    if cancelled {
        txn.rollback()?;
        return Ok(false);
    }
    txn.commit()?;
    Ok(true)
}
