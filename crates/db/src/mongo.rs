use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{Client, Collection};
use shelf_kernel::CollectionSchema;

use crate::error::DbError;
use crate::store::{DeleteOutcome, DocumentStore, UpdateOutcome};

/// MongoDB-backed store holding one client for the process.
pub struct MongoStore {
    client: Client,
    database: mongodb::Database,
}

impl MongoStore {
    /// Build a client and ping the server so connection failures surface
    /// before the first query.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, DbError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|source| DbError::Connect {
                uri: uri.to_string(),
                source,
            })?;
        let database = client.database(database);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| DbError::Connect {
                uri: uri.to_string(),
                source,
            })?;

        Ok(Self { client, database })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), DbError> {
        let existing = self.database.list_collection_names().await?;
        let validator = schema.json_schema();

        if existing.iter().any(|name| name == schema.collection) {
            self.database
                .run_command(doc! {
                    "collMod": schema.collection,
                    "validator": validator,
                    "validationLevel": "strict",
                })
                .await?;
        } else {
            self.database
                .create_collection(schema.collection)
                .validator(validator)
                .await?;
        }

        Ok(())
    }

    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>, DbError> {
        let cursor = self.collection(collection).find(filter).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, DbError> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), DbError> {
        self.collection(collection)
            .insert_one(document)
            .await
            .map_err(|err| DbError::from_write(collection, err))?;
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<(), DbError> {
        self.collection(collection)
            .insert_many(documents)
            .await
            .map_err(|err| DbError::from_write(collection, err))?;
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> Result<UpdateOutcome, DbError> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": set })
            .await
            .map_err(|err| DbError::from_write(collection, err))?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteOutcome, DbError> {
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(DeleteOutcome {
            deleted_count: result.deleted_count,
        })
    }

    async fn close(&self) -> Result<(), DbError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}
