use crate::schema::{Column, ColumnType};

/// A raw tab-separated record: one entry per field, empty fields as `None`
pub type RawRecord = Vec<Option<String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// Returns `None` for comment lines (`#...`) and blank lines
pub fn split_record(line: &str) -> Option<RawRecord> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.starts_with('#') || line.is_empty() {
        return None;
    }

    Some(
        line.split('\t')
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect(),
    )
}

/// Convert a field to the column's SQL type. `Err` carries the raw text
/// that failed to parse.
pub fn convert_field(field: Option<&str>, column: &Column) -> Result<SqlValue, String> {
    let Some(raw) = field else {
        return Ok(SqlValue::Null);
    };

    match column.col_type {
        ColumnType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(SqlValue::Integer)
            .map_err(|_| raw.to_string()),
        ColumnType::Real => raw
            .trim()
            .parse::<f64>()
            .map(SqlValue::Real)
            .map_err(|_| raw.to_string()),
        ColumnType::Text | ColumnType::Date => Ok(SqlValue::Text(raw.to_string())),
    }
}
