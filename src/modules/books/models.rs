use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use shelf_db::Model;
use shelf_kernel::CollectionSchema;

/// A stored book document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier for the book
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Free-form publication date, never parsed
    pub published_date: String,
    /// Publisher reference; not checked against `publishers`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<ObjectId>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl Model for Book {
    fn schema() -> &'static CollectionSchema {
        &super::SCHEMA
    }
}

/// Input model for creating a new book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub published_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<ObjectId>,
}

impl CreateBook {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        published_date: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            published_date: published_date.into(),
            publisher_id: None,
        }
    }

    /// Attach a publisher reference, if one was resolved.
    pub fn published_by(mut self, publisher_id: Option<ObjectId>) -> Self {
        self.publisher_id = publisher_id;
        self
    }
}
