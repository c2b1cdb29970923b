//! Per-table row transforms applied while loading a dump file

use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension};

use super::error::IngestError;
use crate::config::{ADMINISTRATIVE_TABLE_NAME, CITY_TABLE_NAME, COUNTRY_TABLE_NAME};
use crate::parser::SqlValue;
use crate::schema::tables::{ADMINISTRATIVE_UNIT, ALTERNATE_NAME, CITY, COUNTRY};
use crate::schema::TableSchema;

/// Turns the typed source fields of one line into the row that gets
/// inserted, resolving foreign keys against tables loaded earlier.
pub trait RowLoader {
    fn schema(&self) -> &'static TableSchema;

    /// `Ok(None)` drops the line.
    fn transform(
        &self,
        conn: &Connection,
        line: usize,
        row: Vec<SqlValue>,
    ) -> Result<Option<Vec<SqlValue>>, IngestError>;
}

fn text(value: &SqlValue) -> Option<&str> {
    match value {
        SqlValue::Text(s) => Some(s.as_str()),
        _ => None,
    }
}

fn country_id_by_iso(conn: &Connection, iso: &str) -> rusqlite::Result<Option<i64>> {
    conn.prepare_cached(&format!(
        "SELECT geonames_id FROM {COUNTRY_TABLE_NAME} WHERE iso = ?1"
    ))?
    .query_row([iso], |row| row.get(0))
    .optional()
}

fn administrative_unit_id_by_key(conn: &Connection, key: &str) -> rusqlite::Result<Option<i64>> {
    conn.prepare_cached(&format!(
        "SELECT geonames_id FROM {ADMINISTRATIVE_TABLE_NAME} WHERE key = ?1"
    ))?
    .query_row([key], |row| row.get(0))
    .optional()
}

fn id_exists(conn: &Connection, table: &str, geonames_id: i64) -> rusqlite::Result<bool> {
    conn.prepare_cached(&format!(
        "SELECT 1 FROM {table} WHERE geonames_id = ?1"
    ))?
    .exists([geonames_id])
}

fn resolve_country(
    conn: &Connection,
    table: &'static str,
    line: usize,
    iso: &str,
) -> Result<i64, IngestError> {
    country_id_by_iso(conn, iso)?.ok_or_else(|| IngestError::UnresolvedCountry {
        table,
        line,
        iso: iso.to_string(),
    })
}

/// `countryInfo.txt` rows are inserted as they are
pub struct CountryLoader;

impl RowLoader for CountryLoader {
    fn schema(&self) -> &'static TableSchema {
        &COUNTRY
    }

    fn transform(
        &self,
        _conn: &Connection,
        _line: usize,
        row: Vec<SqlValue>,
    ) -> Result<Option<Vec<SqlValue>>, IngestError> {
        Ok(Some(row))
    }
}

/// Appends `country_id`, taken from the `CC` prefix of the `CC.code` key
pub struct AdministrativeUnitLoader;

impl RowLoader for AdministrativeUnitLoader {
    fn schema(&self) -> &'static TableSchema {
        &ADMINISTRATIVE_UNIT
    }

    fn transform(
        &self,
        conn: &Connection,
        line: usize,
        mut row: Vec<SqlValue>,
    ) -> Result<Option<Vec<SqlValue>>, IngestError> {
        let table = ADMINISTRATIVE_UNIT.name;
        let key = text(&row[0]).ok_or(IngestError::MissingField {
            table,
            column: "key",
            line,
        })?;
        let iso = key.split('.').next().unwrap_or(key);

        let country_id = resolve_country(conn, table, line, iso)?;
        row.push(SqlValue::Integer(country_id));
        Ok(Some(row))
    }
}

/// Appends `administrative_unit_id` (nullable) and `country_id`
pub struct CityLoader;

impl CityLoader {
    const COUNTRY_CODE: usize = 8;
    const ADMIN1_CODE: usize = 10;
}

impl RowLoader for CityLoader {
    fn schema(&self) -> &'static TableSchema {
        &CITY
    }

    fn transform(
        &self,
        conn: &Connection,
        line: usize,
        mut row: Vec<SqlValue>,
    ) -> Result<Option<Vec<SqlValue>>, IngestError> {
        let table = CITY.name;
        let country_code = text(&row[Self::COUNTRY_CODE])
            .ok_or(IngestError::MissingField {
                table,
                column: "country_code",
                line,
            })?
            .to_string();

        let administrative_unit_id = match text(&row[Self::ADMIN1_CODE]) {
            Some(admin_code) => {
                administrative_unit_id_by_key(conn, &format!("{country_code}.{admin_code}"))?
            }
            None => None,
        };
        let country_id = resolve_country(conn, table, line, &country_code)?;

        row.push(administrative_unit_id.map_or(SqlValue::Null, SqlValue::Integer));
        row.push(SqlValue::Integer(country_id));
        Ok(Some(row))
    }
}

/// Which alternate names survive the load
#[derive(Debug, Clone, Default)]
pub struct AlternateNameOptions {
    /// Names without a language tag are always accepted
    pub accepted_languages: HashSet<String>,
}

impl AlternateNameOptions {
    pub fn new<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted_languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn accepts(&self, lang: Option<&str>) -> bool {
        lang.map_or(true, |lang| self.accepted_languages.contains(lang))
    }
}

/// Keeps names in an accepted language whose target is a known country,
/// city or administrative unit; everything else is dropped.
pub struct AlternateNameLoader {
    options: AlternateNameOptions,
}

impl AlternateNameLoader {
    const GEONAMES_ID: usize = 1;
    const LANG: usize = 2;

    /// Parent tables, checked in this order
    const PARENTS: [&'static str; 3] = [COUNTRY_TABLE_NAME, CITY_TABLE_NAME, ADMINISTRATIVE_TABLE_NAME];

    pub fn new(options: AlternateNameOptions) -> Self {
        Self { options }
    }
}

impl RowLoader for AlternateNameLoader {
    fn schema(&self) -> &'static TableSchema {
        &ALTERNATE_NAME
    }

    fn transform(
        &self,
        conn: &Connection,
        line: usize,
        row: Vec<SqlValue>,
    ) -> Result<Option<Vec<SqlValue>>, IngestError> {
        if !self.options.accepts(text(&row[Self::LANG])) {
            return Ok(None);
        }

        let geonames_id = row[Self::GEONAMES_ID]
            .as_integer()
            .ok_or(IngestError::MissingField {
                table: ALTERNATE_NAME.name,
                column: "geonames_id",
                line,
            })?;

        for table in Self::PARENTS {
            if id_exists(conn, table, geonames_id)? {
                return Ok(Some(row));
            }
        }

        Ok(None)
    }
}
