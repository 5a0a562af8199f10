//! Database client factory and collection migrations for shelf.
//!
//! A [`Database`] is opened explicitly and handed to whatever needs it; there
//! is no process-global connection. [`with_connection`] and
//! [`Database::scoped`] guarantee the connection is closed on every exit path
//! of the operation they wrap.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use shelf_kernel::settings::DatabaseSettings;
use shelf_kernel::Migration;

pub mod collection;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod store;

pub use collection::{Collection, Model};
pub use error::DbError;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{DeleteOutcome, DocumentStore, UpdateOutcome};

const MEMORY_SCHEME: &str = "memory://";
const MONGO_SCHEMES: &[&str] = &["mongodb://", "mongodb+srv://"];

/// Handle to an open database. Clones share the same connection.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
}

impl Database {
    /// Open the database named by `settings`.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let uri = settings.uri.as_str();

        let store: Arc<dyn DocumentStore> = if uri.starts_with(MEMORY_SCHEME) {
            Arc::new(MemoryStore::new())
        } else if MONGO_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
            Arc::new(MongoStore::connect(uri, &settings.name).await?)
        } else {
            return Err(DbError::UnsupportedUri(settings.uri.clone()));
        };

        tracing::info!(
            target: "shelf-db",
            backend = store.backend(),
            database = %settings.name,
            "database connection established"
        );

        Ok(Self { store })
    }

    /// Fresh process-local database.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    pub fn from_store(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn collection<T: Model>(&self) -> Collection<T> {
        Collection::new(Arc::clone(&self.store))
    }

    /// Apply migrations in the given order.
    pub async fn apply_migrations(&self, migrations: &[(String, Migration)]) -> anyhow::Result<()> {
        for (module, migration) in migrations {
            tracing::info!(
                target: "shelf-db",
                module = %module,
                migration = migration.id,
                collection = migration.schema.collection,
                "applying migration"
            );
            self.store
                .ensure_collection(migration.schema)
                .await
                .with_context(|| {
                    format!("failed to apply migration '{}/{}'", module, migration.id)
                })?;
        }
        Ok(())
    }

    /// Close the connection.
    pub async fn close(self) -> Result<(), DbError> {
        self.store.close().await?;
        tracing::info!(target: "shelf-db", "database connection closed");
        Ok(())
    }

    /// Run `op` with a handle to this database, then close it whether `op`
    /// succeeded or not. A close failure is logged; `op`'s result wins.
    pub async fn scoped<F, Fut, T>(self, op: F) -> anyhow::Result<T>
    where
        F: FnOnce(Database) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let result = op(self.clone()).await;

        if let Err(err) = self.close().await {
            tracing::warn!(target: "shelf-db", error = %err, "failed to close database connection");
        }

        result
    }
}

/// Connect with `settings`, run `op`, and always close the connection.
pub async fn with_connection<F, Fut, T>(settings: &DatabaseSettings, op: F) -> anyhow::Result<T>
where
    F: FnOnce(Database) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let database = Database::connect(settings)
        .await
        .with_context(|| "failed to open database connection")?;
    database.scoped(op).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_kernel::{CollectionSchema, FieldKind, FieldSpec};
    use std::sync::atomic::{AtomicBool, Ordering};

    static ITEMS: CollectionSchema = CollectionSchema {
        collection: "items",
        fields: &[FieldSpec::required("name", FieldKind::String)],
        timestamps: false,
    };

    #[tokio::test]
    async fn connect_selects_memory_backend() {
        let database = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        assert_eq!(database.backend(), "memory");
    }

    #[tokio::test]
    async fn connect_rejects_unknown_scheme() {
        let settings = DatabaseSettings {
            uri: "postgres://localhost/library".to_string(),
            ..DatabaseSettings::default()
        };
        let err = Database::connect(&settings).await.err().unwrap();
        assert!(matches!(err, DbError::UnsupportedUri(_)));
    }

    #[tokio::test]
    async fn scoped_closes_after_success() {
        let store = Arc::new(MemoryStore::new());
        let database = Database::from_store(store.clone());

        let value = database.scoped(|_db| async { Ok(7) }).await.unwrap();

        assert_eq!(value, 7);
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn scoped_closes_after_error() {
        let store = Arc::new(MemoryStore::new());
        let database = Database::from_store(store.clone());

        let result: anyhow::Result<()> = database
            .scoped(|_db| async { Err(anyhow::anyhow!("query failed")) })
            .await;

        assert_eq!(result.unwrap_err().to_string(), "query failed");
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn apply_migrations_installs_validators() {
        let store = Arc::new(MemoryStore::new());
        let database = Database::from_store(store.clone());
        let migrations = vec![(
            "items".to_string(),
            Migration {
                id: "001_init",
                schema: &ITEMS,
            },
        )];

        database.apply_migrations(&migrations).await.unwrap();
        // Re-applying is a no-op.
        database.apply_migrations(&migrations).await.unwrap();

        let err = store
            .insert_one("items", bson::doc! { "_id": bson::oid::ObjectId::new() })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn with_connection_rejects_bad_uri_before_running() {
        let settings = DatabaseSettings {
            uri: "nope".to_string(),
            ..DatabaseSettings::default()
        };
        let ran = AtomicBool::new(false);
        let result = with_connection(&settings, |_db| async {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;
        assert!(result.is_err());
        assert!(!ran.load(Ordering::SeqCst));
    }
}
