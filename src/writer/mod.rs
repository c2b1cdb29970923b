pub mod error;
pub mod loader;
pub mod schema_gen;
pub mod sqlite;

pub use error::IngestError;
pub use loader::{AlternateNameOptions, RowLoader};
pub use sqlite::*;
