use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    KeyNotFound,
    Closed,
    TransactionConsumed,
    Storage(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::KeyNotFound => write!(f, "key not found"),
            StoreError::Closed => write!(f, "store is closed"),
            StoreError::TransactionConsumed => write!(f, "transaction already consumed"),
            StoreError::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}
