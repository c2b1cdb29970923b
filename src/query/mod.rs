pub mod engine;
pub mod error;
pub mod mapping;

pub use engine::{CityDatabase, ConnectOptions};
pub use error::QueryError;
pub use mapping::{CityInfo, KeyValueRow, RawRow, RowMapper, RowMappers};
