use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use shelf_db::Model;
use shelf_kernel::CollectionSchema;

/// A stored publisher document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Unconstrained by the collection, so it may be absent or `null`.
    #[serde(default)]
    pub name: Option<String>,
}

impl Model for Publisher {
    fn schema() -> &'static CollectionSchema {
        &super::SCHEMA
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePublisher {
    pub name: String,
}

impl CreatePublisher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
