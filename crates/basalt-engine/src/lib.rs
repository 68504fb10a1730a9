mod backfill;
mod error;
mod index;
pub mod key;
mod lex;
mod metadata;

pub use backfill::{BackfillHandle, CancelHandle, CancelToken};
pub use error::EngineError;
pub use index::IndexManager;
pub use lex::encode_lex;
pub use metadata::{
    CollectionMetadata, ID_FIELD, ID_INDEX_NAME, IndexField, IndexModel, IndexOptions,
};
