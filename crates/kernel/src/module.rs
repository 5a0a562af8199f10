use crate::schema::CollectionSchema;

/// Migration definition for modules
///
/// Applying a migration creates the collection when it is missing and
/// installs (or replaces) its validator. Applying it twice is a no-op.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub schema: &'static CollectionSchema,
}

/// A model module owns one or more collections
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Return migrations contributed by this module
    /// Migrations are executed in the order returned
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }
}
