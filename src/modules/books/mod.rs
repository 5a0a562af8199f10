pub mod models;

use std::sync::Arc;

use bson::doc;
use shelf_db::{Database, DbError, DeleteOutcome, UpdateOutcome};
use shelf_kernel::{CollectionSchema, FieldKind, FieldSpec, Migration, Module};

use crate::modules::publishers::{self, Publisher};

pub use models::{Book, CreateBook};

/// `books` collection declaration.
pub static SCHEMA: CollectionSchema = CollectionSchema {
    collection: "books",
    fields: &[
        FieldSpec::required("title", FieldKind::String),
        FieldSpec::required("author", FieldKind::String),
        FieldSpec::required("published_date", FieldKind::String),
        FieldSpec::optional("publisher_id", FieldKind::ObjectId),
    ],
    timestamps: true,
};

/// Books module: owns the `books` collection
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            schema: &SCHEMA,
        }]
    }
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}

pub async fn find_all(db: &Database) -> Result<Vec<Book>, DbError> {
    db.collection::<Book>().find(doc! {}).await
}

pub async fn find_by_title(db: &Database, title: &str) -> Result<Vec<Book>, DbError> {
    db.collection::<Book>().find(doc! { "title": title }).await
}

pub async fn create(db: &Database, book: &CreateBook) -> Result<Book, DbError> {
    db.collection::<Book>().insert_one(book).await
}

/// Insert all books in one ordered bulk call.
pub async fn create_many(db: &Database, books: &[CreateBook]) -> Result<Vec<Book>, DbError> {
    db.collection::<Book>().insert_many(books).await
}

/// Retitle the first book whose title is exactly `title`.
pub async fn update_title(
    db: &Database,
    title: &str,
    new_title: &str,
) -> Result<UpdateOutcome, DbError> {
    db.collection::<Book>()
        .update_one(doc! { "title": title }, doc! { "title": new_title })
        .await
}

/// Delete the first book whose title is exactly `title`.
pub async fn delete_by_title(db: &Database, title: &str) -> Result<DeleteOutcome, DbError> {
    db.collection::<Book>()
        .delete_one(doc! { "title": title })
        .await
}

/// Resolve a book's publisher reference. `None` when the book has no
/// reference or the referenced publisher is gone.
pub async fn publisher_of(db: &Database, book: &Book) -> Result<Option<Publisher>, DbError> {
    match book.publisher_id {
        Some(id) => publishers::find_by_id(db, id).await,
        None => Ok(None),
    }
}
