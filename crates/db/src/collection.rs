use std::marker::PhantomData;
use std::sync::Arc;

use bson::{oid::ObjectId, Document};
use serde::{de::DeserializeOwned, Serialize};
use shelf_kernel::schema::{CollectionSchema, CREATED_AT, UPDATED_AT};

use crate::error::DbError;
use crate::store::{DeleteOutcome, DocumentStore, UpdateOutcome};

/// A typed document stored in one collection.
pub trait Model: Serialize + DeserializeOwned + Send + Sync {
    fn schema() -> &'static CollectionSchema;
}

/// Typed view over one collection.
///
/// Inserts assign `_id` when the input has none and stamp `createdAt` /
/// `updatedAt` on timestamped schemas; updates refresh `updatedAt`.
/// Every write is checked against the model's schema before it reaches the
/// store, whether or not the collection's validator has been installed.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    schema: &'static CollectionSchema,
    _model: PhantomData<fn() -> T>,
}

impl<T: Model> Collection<T> {
    pub(crate) fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            schema: T::schema(),
            _model: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.schema.collection
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<T>, DbError> {
        tracing::debug!(collection = self.name(), filter = %filter, "find");
        let documents = self.store.find(self.name(), filter).await?;
        documents
            .into_iter()
            .map(|document| bson::from_document(document).map_err(DbError::from))
            .collect()
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, DbError> {
        tracing::debug!(collection = self.name(), filter = %filter, "find_one");
        match self.store.find_one(self.name(), filter).await? {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Insert one document and return it as stored.
    pub async fn insert_one<I: Serialize>(&self, input: &I) -> Result<T, DbError> {
        let (document, model) = self.prepare(input)?;
        tracing::debug!(collection = self.name(), "insert_one");
        self.store.insert_one(self.name(), document).await?;
        Ok(model)
    }

    /// Ordered bulk insert in a single call.
    pub async fn insert_many<I: Serialize>(&self, inputs: &[I]) -> Result<Vec<T>, DbError> {
        let (documents, models): (Vec<_>, Vec<_>) = inputs
            .iter()
            .map(|input| self.prepare(input))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();
        tracing::debug!(
            collection = self.name(),
            count = documents.len(),
            "insert_many"
        );
        self.store.insert_many(self.name(), documents).await?;
        Ok(models)
    }

    pub async fn update_one(
        &self,
        filter: Document,
        mut set: Document,
    ) -> Result<UpdateOutcome, DbError> {
        self.schema
            .validate_fields(&set)
            .map_err(|violations| DbError::validation(self.name(), violations))?;
        if self.schema.timestamps {
            set.insert(UPDATED_AT, bson::DateTime::now());
        }
        tracing::debug!(collection = self.name(), filter = %filter, "update_one");
        self.store.update_one(self.name(), filter, set).await
    }

    pub async fn delete_one(&self, filter: Document) -> Result<DeleteOutcome, DbError> {
        tracing::debug!(collection = self.name(), filter = %filter, "delete_one");
        self.store.delete_one(self.name(), filter).await
    }

    /// Build the stored document and its decoded model. Nothing is written
    /// unless both succeed.
    fn prepare<I: Serialize>(&self, input: &I) -> Result<(Document, T), DbError> {
        let mut document = bson::to_document(input)?;
        if !document.contains_key("_id") {
            document.insert("_id", ObjectId::new());
        }
        if self.schema.timestamps {
            let now = bson::DateTime::now();
            document.insert(CREATED_AT, now);
            document.insert(UPDATED_AT, now);
        }
        self.schema
            .validate(&document)
            .map_err(|violations| DbError::validation(self.name(), violations))?;
        let model = bson::from_document(document.clone())?;
        Ok((document, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use bson::doc;
    use serde::Deserialize;
    use shelf_kernel::{FieldKind, FieldSpec};

    static NOTES: CollectionSchema = CollectionSchema {
        collection: "notes",
        fields: &[FieldSpec::required("body", FieldKind::String)],
        timestamps: true,
    };

    static PLAIN: CollectionSchema = CollectionSchema {
        collection: "plain",
        fields: &[],
        timestamps: false,
    };

    #[derive(Debug, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
        id: Option<ObjectId>,
        body: String,
        #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
        created_at: Option<bson::DateTime>,
        #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
        updated_at: Option<bson::DateTime>,
    }

    impl Model for Note {
        fn schema() -> &'static CollectionSchema {
            &NOTES
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Plain {
        #[serde(rename = "_id")]
        id: ObjectId,
        #[serde(rename = "createdAt", default)]
        created_at: Option<bson::DateTime>,
    }

    impl Model for Plain {
        fn schema() -> &'static CollectionSchema {
            &PLAIN
        }
    }

    #[derive(Serialize)]
    struct NewNote<'a> {
        body: &'a str,
    }

    async fn notes() -> Collection<Note> {
        let store = Arc::new(MemoryStore::new());
        store.ensure_collection(&NOTES).await.unwrap();
        Collection::new(store)
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let notes = notes().await;
        let note = notes.insert_one(&NewNote { body: "hi" }).await.unwrap();

        assert!(note.id.is_some());
        assert!(note.created_at.is_some());
        assert_eq!(note.created_at, note.updated_at);

        let found = notes.find(doc! { "body": "hi" }).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, note.id);
    }

    #[tokio::test]
    async fn untimestamped_schema_gets_no_timestamps() {
        let plain: Collection<Plain> = Collection::new(Arc::new(MemoryStore::new()));
        let inserted = plain.insert_one(&doc! {}).await.unwrap();
        assert!(inserted.created_at.is_none());
    }

    #[tokio::test]
    async fn insert_keeps_caller_id() {
        let notes = notes().await;
        let id = ObjectId::new();
        let note = notes
            .insert_one(&doc! { "_id": id, "body": "pinned" })
            .await
            .unwrap();
        assert_eq!(note.id, Some(id));
    }

    #[tokio::test]
    async fn invalid_insert_persists_nothing() {
        let notes = notes().await;
        let err = notes.insert_one(&NewNote { body: "" }).await.unwrap_err();
        assert!(err.is_validation());
        assert!(notes.find(doc! {}).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_refreshes_updated_at() {
        let notes = notes().await;
        let note = notes.insert_one(&NewNote { body: "old" }).await.unwrap();

        let outcome = notes
            .update_one(doc! { "body": "old" }, doc! { "body": "new" })
            .await
            .unwrap();
        assert_eq!(outcome.modified_count, 1);

        let updated = notes
            .find_one(doc! { "body": "new" })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.created_at, note.created_at);
        assert!(updated.updated_at >= note.updated_at);
    }

    #[tokio::test]
    async fn insert_many_returns_documents_in_order() {
        let notes = notes().await;
        let inserted = notes
            .insert_many(&[NewNote { body: "one" }, NewNote { body: "two" }])
            .await
            .unwrap();
        let bodies: Vec<_> = inserted.iter().map(|n| n.body.as_str()).collect();
        assert_eq!(bodies, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn insert_is_validated_without_installed_validator() {
        let store = Arc::new(MemoryStore::new());
        let notes: Collection<Note> = Collection::new(store.clone());

        let err = notes.insert_one(&NewNote { body: "" }).await.unwrap_err();
        assert!(err.is_validation());
        let err = notes
            .insert_many(&[NewNote { body: "fine" }, NewNote { body: "" }])
            .await
            .unwrap_err();
        assert!(err.is_validation());

        assert!(store.find("notes", doc! {}).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_is_validated_without_installed_validator() {
        let notes: Collection<Note> = Collection::new(Arc::new(MemoryStore::new()));
        notes.insert_one(&NewNote { body: "keep" }).await.unwrap();

        let err = notes
            .update_one(doc! { "body": "keep" }, doc! { "body": "" })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(notes
            .find_one(doc! { "body": "keep" })
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn undecodable_input_is_not_stored() {
        let store = Arc::new(MemoryStore::new());
        let plain: Collection<Plain> = Collection::new(store.clone());

        let err = plain
            .insert_one(&doc! { "createdAt": "not a date" })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Decode(_)));
        assert!(store.find("plain", doc! {}).await.unwrap().is_empty());
    }
}
