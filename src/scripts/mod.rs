//! One-shot scripts. Each takes an open [`shelf_db::Database`] and leaves
//! closing it to the caller.

pub mod query;
pub mod seed;
