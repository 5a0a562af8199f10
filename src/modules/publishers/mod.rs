pub mod models;

use std::sync::Arc;

use bson::{doc, oid::ObjectId};
use shelf_db::{Database, DbError};
use shelf_kernel::{CollectionSchema, FieldKind, FieldSpec, Migration, Module};

pub use models::{CreatePublisher, Publisher};

/// `publishers` collection declaration.
pub static SCHEMA: CollectionSchema = CollectionSchema {
    collection: "publishers",
    fields: &[FieldSpec::optional("name", FieldKind::String)],
    timestamps: false,
};

/// Publishers module: owns the `publishers` collection
pub struct PublishersModule;

impl PublishersModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Module for PublishersModule {
    fn name(&self) -> &'static str {
        "publishers"
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            schema: &SCHEMA,
        }]
    }
}

pub fn create_module() -> Arc<dyn Module> {
    Arc::new(PublishersModule::new())
}

/// Publishers whose name is exactly `name`.
pub async fn find_by_name(db: &Database, name: &str) -> Result<Vec<Publisher>, DbError> {
    db.collection::<Publisher>().find(doc! { "name": name }).await
}

pub async fn find_by_id(db: &Database, id: ObjectId) -> Result<Option<Publisher>, DbError> {
    db.collection::<Publisher>().find_one(doc! { "_id": id }).await
}

/// Any one publisher, in natural order.
pub async fn find_first(db: &Database) -> Result<Option<Publisher>, DbError> {
    db.collection::<Publisher>().find_one(doc! {}).await
}

pub async fn create(db: &Database, publisher: &CreatePublisher) -> Result<Publisher, DbError> {
    db.collection::<Publisher>().insert_one(publisher).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_database;

    #[tokio::test]
    async fn find_by_name_is_exact() {
        let db = test_database().await;
        let penguin = create(&db, &CreatePublisher::new("Penguin Books"))
            .await
            .unwrap();
        create(&db, &CreatePublisher::new("Penguin"))
            .await
            .unwrap();

        assert_eq!(
            find_by_name(&db, "Penguin Books").await.unwrap(),
            vec![penguin.clone()]
        );
        assert_eq!(find_by_id(&db, penguin.id).await.unwrap(), Some(penguin));
        assert!(find_by_name(&db, "penguin books").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn publisher_without_name_round_trips() {
        let db = test_database().await;
        let publishers = db.collection::<Publisher>();
        let unnamed = publishers
            .insert_one(&doc! { "name": bson::Bson::Null })
            .await
            .unwrap();
        assert_eq!(unnamed.name, None);
        publishers.insert_one(&doc! {}).await.unwrap();

        assert_eq!(find_first(&db).await.unwrap(), Some(unnamed.clone()));
        assert_eq!(find_by_id(&db, unnamed.id).await.unwrap(), Some(unnamed));
        assert_eq!(publishers.find(doc! {}).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn find_first_on_empty_collection_is_none() {
        let db = test_database().await;
        assert_eq!(find_first(&db).await.unwrap(), None);
    }
}
