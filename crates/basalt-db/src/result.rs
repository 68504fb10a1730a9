use basalt_engine::IndexModel;
use bson::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOneResult {
    pub inserted_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<String>,
}

/// Result of a `find`: matching documents after sort and pagination,
/// the match count before pagination, and the index the planner chose
/// (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct FindResult {
    pub documents: Vec<Document>,
    pub total_count: u64,
    pub index_used: Option<IndexModel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOneResult {
    pub modified_id: Option<String>,
    pub upserted_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateManyResult {
    pub modified_ids: Vec<String>,
    pub upserted_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOneResult {
    pub deleted_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteManyResult {
    pub deleted_ids: Vec<String>,
}
