use rusqlite::{Connection, ErrorCode};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::IngestError;
use super::loader::{
    AdministrativeUnitLoader, AlternateNameLoader, AlternateNameOptions, CityLoader,
    CountryLoader, RowLoader,
};
use super::schema_gen::{generate_create_table, generate_drop_table, generate_indexes, generate_insert};
use crate::config::{ALTERNATE_NAME_TABLE_NAME, CITY_FTS_TABLE_NAME, CITY_TABLE_NAME};
use crate::language::{language_columns, resolve_languages, validate_language};
use crate::parser::{convert_field, split_record, SqlValue};
use crate::schema::tables::{ALL_TABLES, LOCALIZED_TABLES};
use crate::ui::{Phase, Ui};

/// Rows between progress updates
const PROGRESS_INTERVAL: u64 = 1000;

/// Builds the GeoNames store. Every method is a full rebuild of the part of
/// the store it touches.
pub struct GeonamesWriter {
    conn: Connection,
}

impl GeonamesWriter {
    pub fn open(db_path: &Path) -> Result<Self, IngestError> {
        let conn = Connection::open(db_path).map_err(|source| IngestError::OpenDatabase {
            path: db_path.to_path_buf(),
            source,
        })?;

        // Enforce foreign keys and optimize for bulk insert
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )?;

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drop and recreate all tables (children first when dropping)
    pub fn init_tables(&mut self) -> Result<(), IngestError> {
        let tx = self.conn.transaction()?;

        tx.execute(&format!("DROP TABLE IF EXISTS {CITY_FTS_TABLE_NAME}"), [])
            .map_err(IngestError::schema(format!("drop {CITY_FTS_TABLE_NAME}")))?;
        for schema in ALL_TABLES.iter().rev() {
            tx.execute(&generate_drop_table(schema), [])
                .map_err(IngestError::schema(format!("drop {}", schema.name)))?;
        }

        for schema in ALL_TABLES {
            tx.execute(&generate_create_table(schema), [])
                .map_err(IngestError::schema(format!("create table {}", schema.name)))?;

            for index_sql in generate_indexes(schema) {
                tx.execute(&index_sql, [])
                    .map_err(IngestError::schema(format!("create index for {}", schema.name)))?;
            }
        }

        tx.commit()?;
        info!(tables = ALL_TABLES.len(), "initialised tables");
        Ok(())
    }

    pub fn load_countries(&mut self, path: &Path, ui: &mut impl Ui) -> Result<u64, IngestError> {
        self.load_file(path, &CountryLoader, ui)
    }

    pub fn load_administrative_units(
        &mut self,
        path: &Path,
        ui: &mut impl Ui,
    ) -> Result<u64, IngestError> {
        self.load_file(path, &AdministrativeUnitLoader, ui)
    }

    pub fn load_cities(&mut self, path: &Path, ui: &mut impl Ui) -> Result<u64, IngestError> {
        self.load_file(path, &CityLoader, ui)
    }

    pub fn load_alternate_names(
        &mut self,
        path: &Path,
        options: &AlternateNameOptions,
        ui: &mut impl Ui,
    ) -> Result<u64, IngestError> {
        self.load_file(path, &AlternateNameLoader::new(options.clone()), ui)
    }

    /// Load one tab-separated dump into its table. The whole file commits at
    /// once; any error rolls it back. Returns the number of inserted rows.
    pub fn load_file(
        &mut self,
        path: &Path,
        loader: &impl RowLoader,
        ui: &mut impl Ui,
    ) -> Result<u64, IngestError> {
        let schema = loader.schema();
        let file = File::open(path).map_err(|source| IngestError::OpenSource {
            path: path.to_path_buf(),
            source,
        })?;
        let total_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);
        let mut reader = BufReader::new(file);

        let source_columns = schema.source();
        let insert_sql = generate_insert(schema);

        let tx = self.conn.transaction()?;
        let mut count: u64 = 0;
        let mut skipped: u64 = 0;
        let mut bytes_read: u64 = 0;
        let mut line_no: usize = 0;
        let mut buf = String::new();

        {
            let mut stmt = tx.prepare(&insert_sql)?;

            loop {
                buf.clear();
                let n = reader.read_line(&mut buf).map_err(|source| IngestError::Read {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    source,
                })?;
                if n == 0 {
                    break;
                }
                line_no += 1;
                bytes_read += n as u64;

                let Some(mut record) = split_record(&buf) else {
                    continue;
                };

                if record.len() > source_columns.len() {
                    return Err(IngestError::TooManyFields {
                        table: schema.name,
                        line: line_no,
                        expected: source_columns.len(),
                        found: record.len(),
                    });
                }
                record.resize(source_columns.len(), None);

                let values = record
                    .iter()
                    .zip(source_columns)
                    .map(|(field, column)| {
                        convert_field(field.as_deref(), column).map_err(|value| {
                            IngestError::InvalidValue {
                                table: schema.name,
                                column: column.name,
                                line: line_no,
                                value,
                            }
                        })
                    })
                    .collect::<Result<Vec<SqlValue>, _>>()?;

                let Some(row) = loader.transform(&tx, line_no, values)? else {
                    skipped += 1;
                    continue;
                };

                for (idx, value) in row.iter().enumerate() {
                    value.bind_to(idx + 1, &mut stmt)?;
                }
                stmt.raw_execute().map_err(|source| IngestError::Insert {
                    table: schema.name,
                    line: line_no,
                    source,
                })?;
                count += 1;

                if count % PROGRESS_INTERVAL == 0 {
                    ui.set_progress(bytes_read, total_bytes, schema.name);
                }
            }
        }

        tx.commit()?;
        ui.set_progress(total_bytes, total_bytes, schema.name);
        ui.log(format!("{}: {} records", schema.name, count));
        info!(table = schema.name, rows = count, skipped, "loaded {:?}", path);

        Ok(count)
    }

    /// Add (if missing) and recompute `name_<lang>` on every localized table.
    /// Columns for languages not in `languages` are dropped.
    ///
    /// The value is the non-historic alternate name for the entity in that
    /// language, preferred names first, lowest alternate-name id on ties.
    pub fn create_alternate_name_columns(&mut self, languages: &[String]) -> Result<(), IngestError> {
        for lang in languages {
            validate_language(lang)?;
        }

        let tx = self.conn.transaction()?;

        for schema in LOCALIZED_TABLES {
            let table = schema.name;
            let stale = language_columns(&tx, table)?
                .into_iter()
                .filter(|lang| !languages.contains(lang));

            for lang in stale {
                let column = format!("name_{lang}");
                tx.execute(&format!("ALTER TABLE {table} DROP COLUMN {column}"), [])
                    .map_err(IngestError::schema(format!("drop column {table}.{column}")))?;
                debug!(table, column = column.as_str(), "dropped column");
            }
        }

        for lang in languages {
            for schema in LOCALIZED_TABLES {
                let table = schema.name;
                let column = format!("name_{lang}");

                match tx.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} TEXT"), []) {
                    Ok(_) => debug!(table, column = column.as_str(), "added column"),
                    Err(e) if is_duplicate_column(&e) => {
                        debug!(table, column = column.as_str(), "column already exists")
                    }
                    Err(source) => {
                        return Err(IngestError::Schema {
                            step: format!("add column {table}.{column}"),
                            source,
                        })
                    }
                }

                let updated = tx
                    .execute(
                        &format!(
                            "UPDATE {table} SET {column} = (
                                SELECT alt.name FROM {ALTERNATE_NAME_TABLE_NAME} AS alt
                                WHERE alt.geonames_id = {table}.geonames_id
                                  AND alt.lang = ?1
                                  AND COALESCE(alt.is_historic, 0) = 0
                                ORDER BY COALESCE(alt.is_preferred, 0) DESC, alt.id ASC
                                LIMIT 1
                            )"
                        ),
                        [lang],
                    )
                    .map_err(IngestError::schema(format!("populate {table}.{column}")))?;
                debug!(table, column = column.as_str(), rows = updated, "populated");
            }
        }

        tx.commit()?;
        info!(languages = ?languages, "materialized language columns");
        Ok(())
    }

    /// Drop and rebuild the city prefix-search index
    pub fn create_city_names_fts(&mut self) -> Result<u64, IngestError> {
        let tx = self.conn.transaction()?;

        tx.execute(&format!("DROP TABLE IF EXISTS {CITY_FTS_TABLE_NAME}"), [])
            .map_err(IngestError::schema(format!("drop {CITY_FTS_TABLE_NAME}")))?;
        tx.execute(
            &format!(
                "CREATE VIRTUAL TABLE {CITY_FTS_TABLE_NAME} \
                 USING fts5(name, geonames_id UNINDEXED, tokenize='unicode61 remove_diacritics 1')"
            ),
            [],
        )
        .map_err(IngestError::schema(format!("create {CITY_FTS_TABLE_NAME}")))?;

        let indexed = tx
            .execute(
                &format!(
                    "INSERT INTO {CITY_FTS_TABLE_NAME}(name, geonames_id) \
                     SELECT COALESCE(alternate_names, name), geonames_id FROM {CITY_TABLE_NAME}"
                ),
                [],
            )
            .map_err(IngestError::schema(format!("populate {CITY_FTS_TABLE_NAME}")))?;

        tx.commit()?;
        info!(rows = indexed, "rebuilt search index");
        Ok(indexed as u64)
    }

    /// Finalize the database
    pub fn finalize(self) -> Result<(), IngestError> {
        self.conn.execute_batch("PRAGMA optimize;")?;
        Ok(())
    }
}

fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::Unknown && msg.starts_with("duplicate column name")
    )
}

/// Local paths of the four dumps
#[derive(Debug, Clone)]
pub struct SourceFiles {
    pub countries: PathBuf,
    pub administrative_units: PathBuf,
    pub cities: PathBuf,
    pub alternate_names: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Languages for alternate names and `name_<lang>` columns
    pub languages: Vec<String>,
}

/// Row counts produced by [`build_database`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub countries: u64,
    pub administrative_units: u64,
    pub cities: u64,
    pub alternate_names: u64,
    pub indexed_cities: u64,
    pub languages: Vec<String>,
}

impl BuildSummary {
    pub fn total_records(&self) -> u64 {
        self.countries + self.administrative_units + self.cities + self.alternate_names
    }
}

/// Run the whole pipeline in dependency order:
/// countries, administrative units, cities, alternate names, language
/// columns, search index.
pub fn build_database(
    sources: &SourceFiles,
    output_db: &Path,
    options: &BuildOptions,
    ui: &mut impl Ui,
) -> Result<BuildSummary, IngestError> {
    let languages = resolve_languages(&options.languages)?;
    let mut writer = GeonamesWriter::open(output_db)?;

    ui.set_phase(Phase::Loading);
    writer.init_tables()?;

    let countries = writer.load_countries(&sources.countries, ui)?;
    let administrative_units = writer.load_administrative_units(&sources.administrative_units, ui)?;
    let cities = writer.load_cities(&sources.cities, ui)?;
    let alternate_names = writer.load_alternate_names(
        &sources.alternate_names,
        &AlternateNameOptions::new(languages.iter().cloned()),
        ui,
    )?;

    ui.set_phase(Phase::Indexing);
    writer.create_alternate_name_columns(&languages)?;
    let indexed_cities = writer.create_city_names_fts()?;

    writer.finalize()?;
    ui.set_phase(Phase::Complete);

    Ok(BuildSummary {
        countries,
        administrative_units,
        cities,
        alternate_names,
        indexed_cities,
        languages,
    })
}
