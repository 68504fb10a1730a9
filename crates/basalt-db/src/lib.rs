mod client;
mod collection;
mod error;
mod planner;
mod result;

pub use client::{Client, Database};
pub use collection::Collection;
pub use error::DbError;
pub use planner::{QueryPlan, QueryPlanner};
pub use result::{
    DeleteManyResult, DeleteOneResult, FindResult, InsertManyResult, InsertOneResult,
    UpdateManyResult, UpdateOneResult,
};

pub use basalt_engine::{
    BackfillHandle, CancelHandle, CancelToken, IndexField, IndexModel, IndexOptions,
};
pub use basalt_query::{DeleteOptions, FindOptions, SortField, UpdateOptions};
