pub mod books;
pub mod publishers;

use anyhow::Context;
use shelf_db::Database;
use shelf_kernel::ModuleRegistry;

/// Register all model modules with the registry
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(publishers::create_module());
    registry.register(books::create_module());
}

/// Registry holding every model module
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    register_all(&mut registry);
    registry
}

/// Install every collection validator. Runs after connecting, before any
/// script touches the data.
pub async fn prepare(db: &Database) -> anyhow::Result<()> {
    let migrations = registry().collect_migrations();
    db.apply_migrations(&migrations)
        .await
        .with_context(|| "failed to prepare collections")
}

#[cfg(test)]
pub(crate) async fn test_database() -> Database {
    let db = Database::in_memory();
    prepare(&db).await.unwrap();
    db
}
