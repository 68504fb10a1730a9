use std::fmt;

use basalt_query::FilterParseError;
use basalt_store::StoreError;

use basalt_engine::EngineError;

#[derive(Debug)]
pub enum DbError {
    Store(StoreError),
    DocumentNotFound,
    InvalidDocument(String),
    EmptyDocumentList,
    MissingFieldForIndex(String),
    EmptyIndexFields,
    DuplicateIndexField(String),
    InvalidIndexOrder(i32),
    IndexAlreadyExists(String),
    UniqueViolation(String),
    InvalidFilter(String),
    Encoding(String),
    Decoding(String),
    CommitFailed(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store error: {e}"),
            Self::DocumentNotFound => write!(f, "document not found"),
            Self::InvalidDocument(msg) => write!(f, "invalid document: {msg}"),
            Self::EmptyDocumentList => write!(f, "document list is empty"),
            Self::MissingFieldForIndex(field) => write!(f, "missing field for index: {field}"),
            Self::EmptyIndexFields => write!(f, "index declares no fields"),
            Self::DuplicateIndexField(field) => write!(f, "duplicate index field: {field}"),
            Self::InvalidIndexOrder(order) => {
                write!(f, "index field order must be 1 or -1, got {order}")
            }
            Self::IndexAlreadyExists(name) => write!(f, "index already exists: {name}"),
            Self::UniqueViolation(name) => write!(f, "unique index violation: {name}"),
            Self::InvalidFilter(msg) => write!(f, "invalid filter: {msg}"),
            Self::Encoding(msg) => write!(f, "encoding error: {msg}"),
            Self::Decoding(msg) => write!(f, "decoding error: {msg}"),
            Self::CommitFailed(msg) => write!(f, "commit failed: {msg}"),
        }
    }
}

impl std::error::Error for DbError {}

impl From<StoreError> for DbError {
    fn from(e: StoreError) -> Self {
        DbError::Store(e)
    }
}

impl From<FilterParseError> for DbError {
    fn from(e: FilterParseError) -> Self {
        DbError::InvalidFilter(e.0)
    }
}

impl From<EngineError> for DbError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Store(se) => DbError::Store(se),
            EngineError::MissingFieldForIndex(field) => DbError::MissingFieldForIndex(field),
            EngineError::EmptyIndexFields => DbError::EmptyIndexFields,
            EngineError::DuplicateIndexField(field) => DbError::DuplicateIndexField(field),
            EngineError::InvalidIndexOrder(order) => DbError::InvalidIndexOrder(order),
            EngineError::IndexAlreadyExists(name) => DbError::IndexAlreadyExists(name),
            EngineError::UniqueViolation(name) => DbError::UniqueViolation(name),
            EngineError::Encoding(msg) => DbError::Encoding(msg),
            EngineError::Decoding(msg) => DbError::Decoding(msg),
        }
    }
}
