use crate::error::StoreError;

/// An ordered key-value store with multi-key atomic transactions.
///
/// Keys are raw byte strings; iteration order is ascending byte order.
/// Direct operations (`get`, `put`, `scan`, ...) act on the latest committed
/// state. A [`Transaction`] obtained from [`Store::begin`] sees a consistent
/// snapshot, reads its own writes, and applies all of them atomically on
/// commit.
pub trait Store {
    type Txn<'a>: Transaction
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Txn<'_>, StoreError>;

    // Reads
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError>;
    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
    fn scan_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError>;

    /// Visit every entry under `prefix` in ascending key order without
    /// materializing the result set. The callback returns `false` to stop
    /// early (cancellation).
    fn stream(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<(), StoreError>;

    // Writes (auto-committed)
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Flush and release the backing files. Every operation after `close`
    /// fails with [`StoreError::Closed`].
    fn close(&self) -> Result<(), StoreError>;
}

/// A snapshot-isolated transaction over a [`Store`].
pub trait Transaction {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError>;
    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
    fn scan_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;
    fn rollback(self) -> Result<(), StoreError>
    where
        Self: Sized;
}
