use async_trait::async_trait;
use bson::Document;
use serde::Serialize;
use shelf_kernel::CollectionSchema;

use crate::error::DbError;

/// Result of an update-one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Result of a delete-one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}

/// Untyped document operations a backend has to provide.
///
/// Filters are exact-match documents: every key must be present with an
/// equal value. An empty filter matches everything. Documents come back in
/// insertion order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend label for logs.
    fn backend(&self) -> &'static str;

    /// Create the collection if missing and install its validator.
    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), DbError>;

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, DbError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DbError>;

    /// Documents must already carry an `_id`.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), DbError>;

    /// Ordered insert: stops at the first failure, keeping earlier documents.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>)
        -> Result<(), DbError>;

    /// Apply `set` as a `$set` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<UpdateOutcome, DbError>;

    async fn delete_one(&self, collection: &str, filter: Document)
        -> Result<DeleteOutcome, DbError>;

    /// Release the connection. Called once, last.
    async fn close(&self) -> Result<(), DbError>;
}
