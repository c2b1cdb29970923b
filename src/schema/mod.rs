pub mod query;
pub mod tables;
pub mod types;

pub use query::*;
pub use tables::*;
pub use types::*;
