//! Settings, schema declarations, and the module registry shared by the
//! shelf crates.

pub mod module;
pub mod registry;
pub mod schema;
pub mod settings;

pub use module::{Migration, Module};
pub use registry::ModuleRegistry;
pub use schema::{CollectionSchema, FieldKind, FieldSpec, FieldViolation, Violation};
