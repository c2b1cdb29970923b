use std::path::PathBuf;

use thiserror::Error;

use crate::language::LanguageError;
use crate::schema::UnknownField;

/// Errors raised by [`super::CityDatabase`]
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueryError {
    /// A read was attempted before `connect` or after `close`.
    #[error("there is no connection to the datasource")]
    NotConnected,
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
    #[error("no row mapper registered for {0}")]
    UnregisteredMapping(&'static str),
    #[error(transparent)]
    InvalidLanguage(#[from] LanguageError),
    #[error("failed to open datasource {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}
