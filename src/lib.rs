//! Book and publisher schemas plus the seed and query scripts that run
//! against them.

pub mod modules;
pub mod scripts;

pub use modules::{books, publishers};
