//! Process-local document store.
//!
//! Selected with a `memory://` URI. It keeps the same write rules as a
//! MongoDB deployment with validators installed: schemas registered through
//! [`DocumentStore::ensure_collection`] are enforced on insert and update,
//! `_id` is unique per collection, and bulk inserts are ordered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bson::Document;
use shelf_kernel::CollectionSchema;

use crate::error::DbError;
use crate::store::{DeleteOutcome, DocumentStore, UpdateOutcome};

#[derive(Default)]
struct MemoryCollection {
    schema: Option<CollectionSchema>,
    documents: Vec<Document>,
}

impl MemoryCollection {
    fn check(&self, name: &str, document: &Document) -> Result<(), DbError> {
        match &self.schema {
            Some(schema) => schema
                .validate(document)
                .map_err(|violations| DbError::validation(name, violations)),
            None => Ok(()),
        }
    }

    fn insert(&mut self, name: &str, document: Document) -> Result<(), DbError> {
        self.check(name, &document)?;
        if let Some(id) = document.get("_id") {
            if self.documents.iter().any(|d| d.get("_id") == Some(id)) {
                return Err(DbError::duplicate_key(
                    name,
                    format!("_id {} already exists", id),
                ));
            }
        }
        self.documents.push(document);
        Ok(())
    }

    fn position(&self, filter: &Document) -> Option<usize> {
        self.documents.iter().position(|d| matches(d, filter))
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| document.get(key) == Some(expected))
}

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, MemoryCollection>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn collections(&self) -> MutexGuard<'_, HashMap<String, MemoryCollection>> {
        // A poisoned map is still structurally valid; keep serving it.
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), DbError> {
        let mut collections = self.collections();
        let entry = collections.entry(schema.collection.to_string()).or_default();
        entry.schema = Some(schema.clone());
        Ok(())
    }

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, DbError> {
        let collections = self.collections();
        Ok(collections
            .get(collection)
            .map(|c| {
                c.documents
                    .iter()
                    .filter(|d| matches(d, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DbError> {
        let collections = self.collections();
        Ok(collections.get(collection).and_then(|c| {
            c.documents.iter().find(|d| matches(d, &filter)).cloned()
        }))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), DbError> {
        let mut collections = self.collections();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(collection, document)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<(), DbError> {
        let mut collections = self.collections();
        let target = collections.entry(collection.to_string()).or_default();
        for document in documents {
            target.insert(collection, document)?;
        }
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<UpdateOutcome, DbError> {
        let mut collections = self.collections();
        let Some(target) = collections.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };
        let Some(index) = target.position(&filter) else {
            return Ok(UpdateOutcome::default());
        };

        let mut updated = target.documents[index].clone();
        for (key, value) in set {
            updated.insert(key, value);
        }
        target.check(collection, &updated)?;

        let modified = updated != target.documents[index];
        target.documents[index] = updated;

        Ok(UpdateOutcome {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteOutcome, DbError> {
        let mut collections = self.collections();
        let deleted = collections
            .get_mut(collection)
            .and_then(|target| {
                target
                    .position(&filter)
                    .map(|index| target.documents.remove(index))
            })
            .is_some();

        Ok(DeleteOutcome {
            deleted_count: u64::from(deleted),
        })
    }

    async fn close(&self) -> Result<(), DbError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
