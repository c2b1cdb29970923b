//! Row mappers: how a result row becomes the caller's output type

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::types::{Value, ValueRef};
use rusqlite::Row;

use super::error::QueryError;

/// Maps `(column names, row)` to an output value
pub type RowMapper<T> = Arc<dyn Fn(&[String], &Row<'_>) -> rusqlite::Result<T> + Send + Sync>;

/// Raw column values in select order
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow(pub Vec<Value>);

/// Column name to JSON value
pub type KeyValueRow = serde_json::Map<String, serde_json::Value>;

/// The minimal city record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityInfo {
    pub id: i64,
    pub name: String,
    pub administrative_name: Option<String>,
    pub country_name: Option<String>,
}

/// Table of row mappers keyed by output type.
///
/// `RowMappers::default()` knows [`RawRow`], [`KeyValueRow`] and
/// [`CityInfo`]; [`RowMappers::register`] adds or replaces entries.
pub struct RowMappers {
    mappers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RowMappers {
    /// A table without any mappers
    pub fn empty() -> Self {
        Self {
            mappers: HashMap::new(),
        }
    }

    pub fn register<T, F>(&mut self, mapper: F) -> &mut Self
    where
        T: 'static,
        F: Fn(&[String], &Row<'_>) -> rusqlite::Result<T> + Send + Sync + 'static,
    {
        let mapper: RowMapper<T> = Arc::new(mapper);
        self.mappers.insert(TypeId::of::<T>(), Box::new(mapper));
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.mappers.contains_key(&TypeId::of::<T>())
    }

    pub fn get<T: 'static>(&self) -> Result<RowMapper<T>, QueryError> {
        self.mappers
            .get(&TypeId::of::<T>())
            .and_then(|mapper| mapper.downcast_ref::<RowMapper<T>>())
            .cloned()
            .ok_or(QueryError::UnregisteredMapping(type_name::<T>()))
    }
}

impl Default for RowMappers {
    fn default() -> Self {
        let mut mappers = Self::empty();
        mappers
            .register(raw_row)
            .register(key_value_row)
            .register(city_info);
        mappers
    }
}

pub fn raw_row(columns: &[String], row: &Row<'_>) -> rusqlite::Result<RawRow> {
    (0..columns.len())
        .map(|idx| row.get::<_, Value>(idx))
        .collect::<rusqlite::Result<Vec<_>>>()
        .map(RawRow)
}

pub fn key_value_row(columns: &[String], row: &Row<'_>) -> rusqlite::Result<KeyValueRow> {
    let mut map = KeyValueRow::new();
    for (idx, column) in columns.iter().enumerate() {
        map.insert(column.clone(), json_value(row.get_ref(idx)?));
    }
    Ok(map)
}

pub fn city_info(_columns: &[String], row: &Row<'_>) -> rusqlite::Result<CityInfo> {
    Ok(CityInfo {
        id: row.get("id")?,
        name: row.get("name")?,
        administrative_name: row.get("administrative_name")?,
        country_name: row.get("country_name")?,
    })
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned().into(),
        ValueRef::Blob(b) => b.iter().copied().map(serde_json::Value::from).collect(),
    }
}
