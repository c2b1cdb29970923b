use std::{io, path::PathBuf};

use thiserror::Error;

use crate::language::LanguageError;

/// Errors that abort an ingestion step. The file being loaded when the
/// error occurs is rolled back.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    #[error("failed to open database at {path:?}: {source}")]
    OpenDatabase {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("failed to open source file {path:?}: {source}")]
    OpenSource { path: PathBuf, source: io::Error },
    #[error("failed to read {path:?} at line {line}: {source}")]
    Read {
        path: PathBuf,
        line: usize,
        source: io::Error,
    },
    #[error("{table}: line {line} has {found} fields, expected at most {expected}")]
    TooManyFields {
        table: &'static str,
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("{table}.{column}: line {line} has unparsable value {value:?}")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        line: usize,
        value: String,
    },
    /// A row references a country ISO code missing from the country table.
    #[error("{table}: line {line} references unknown country {iso:?}")]
    UnresolvedCountry {
        table: &'static str,
        line: usize,
        iso: String,
    },
    #[error("{table}: line {line} is missing required field {column}")]
    MissingField {
        table: &'static str,
        column: &'static str,
        line: usize,
    },
    #[error("{table}: failed to insert line {line}: {source}")]
    Insert {
        table: &'static str,
        line: usize,
        source: rusqlite::Error,
    },
    #[error("failed to {step}: {source}")]
    Schema {
        step: String,
        source: rusqlite::Error,
    },
    #[error(transparent)]
    Language(#[from] LanguageError),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl IngestError {
    pub(crate) fn schema(step: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let step = step.into();
        move |source| IngestError::Schema { step, source }
    }
}
