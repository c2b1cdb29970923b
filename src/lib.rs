//! Offline city lookup over GeoNames dumps stored in SQLite.
//!
//! [`writer`] builds the store from the raw dumps; [`query::CityDatabase`]
//! searches it by name prefix, id, or distance.

pub mod cli;
pub mod config;
pub mod distance;
pub mod download;
pub mod language;
pub mod parser;
pub mod query;
pub mod schema;
pub mod ui;
pub mod writer;

pub use cli::{Cli, Commands};
pub use query::{CityDatabase, CityInfo, ConnectOptions, KeyValueRow, QueryError, RawRow, RowMappers};
pub use schema::CityField;
pub use ui::{ConsoleUi, Phase, SilentUi, Ui};
pub use writer::{build_database, BuildOptions, BuildSummary, GeonamesWriter, IngestError, SourceFiles};
