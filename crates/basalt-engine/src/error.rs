use std::fmt;

use basalt_store::StoreError;

#[derive(Debug)]
pub enum EngineError {
    Store(StoreError),
    MissingFieldForIndex(String),
    EmptyIndexFields,
    DuplicateIndexField(String),
    InvalidIndexOrder(i32),
    IndexAlreadyExists(String),
    UniqueViolation(String),
    Encoding(String),
    Decoding(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::MissingFieldForIndex(field) => write!(f, "missing field for index: {field}"),
            Self::EmptyIndexFields => write!(f, "index declares no fields"),
            Self::DuplicateIndexField(field) => write!(f, "duplicate index field: {field}"),
            Self::InvalidIndexOrder(order) => {
                write!(f, "index field order must be 1 or -1, got {order}")
            }
            Self::IndexAlreadyExists(name) => write!(f, "index already exists: {name}"),
            Self::UniqueViolation(name) => write!(f, "unique index violation: {name}"),
            Self::Encoding(msg) => write!(f, "encoding error: {msg}"),
            Self::Decoding(msg) => write!(f, "decoding error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
