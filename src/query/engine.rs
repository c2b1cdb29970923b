use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Params};
use tracing::{debug, info};

use super::error::QueryError;
use super::mapping::{RowMapper, RowMappers};
use crate::config::CITY_TABLE_NAME;
use crate::distance::register_distance_function;
use crate::language::{language_columns, validate_language};
use crate::schema::{compile_select, fts_prefix_query, CityField, QueryTemplate};

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Open the store read-only (the default)
    pub read_only: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self { read_only: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StatementKey {
    fields: Vec<CityField>,
    template: QueryTemplate,
    lang: Option<String>,
}

/// Query engine over a built store, returning rows as `T`.
///
/// The fetch fields are fixed at construction. Compiled SQL is cached per
/// template and language.
pub struct CityDatabase<T> {
    conn: Option<Connection>,
    fields: Vec<CityField>,
    mapper: RowMapper<T>,
    statements: RefCell<HashMap<StatementKey, Rc<str>>>,
}

impl<T: 'static> CityDatabase<T> {
    /// Fails with [`QueryError::UnregisteredMapping`] when `mappers` has no
    /// entry for `T`. An empty field list selects every city column.
    pub fn new(fields: &[CityField], mappers: &RowMappers) -> Result<Self, QueryError> {
        let fields = if fields.is_empty() {
            vec![CityField::All]
        } else {
            fields.to_vec()
        };

        Ok(Self {
            conn: None,
            fields,
            mapper: mappers.get::<T>()?,
            statements: RefCell::new(HashMap::new()),
        })
    }

    /// Like [`CityDatabase::new`], with fields given by catalog name
    pub fn from_field_names<S: AsRef<str>>(
        names: &[S],
        mappers: &RowMappers,
    ) -> Result<Self, QueryError> {
        let fields = names
            .iter()
            .map(|name| name.as_ref().parse::<CityField>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&fields, mappers)
    }

    pub fn fields(&self) -> &[CityField] {
        &self.fields
    }

    /// Open the datasource and register `DISTANCE`. Reconnecting closes the
    /// previous connection first.
    pub fn connect(
        &mut self,
        datasource: impl AsRef<Path>,
        options: &ConnectOptions,
    ) -> Result<&mut Self, QueryError> {
        let path = datasource.as_ref();
        let flags = if options.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };

        let conn = Connection::open_with_flags(path, flags).map_err(|source| QueryError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        register_distance_function(&conn)?;
        let languages = language_columns(&conn, CITY_TABLE_NAME)?;

        if self.conn.is_some() {
            self.close()?;
        }
        self.conn = Some(conn);

        info!("Connected source {:?}", path);
        debug!("Languages found: {}", languages.join(","));
        Ok(self)
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Close the connection; closing an engine that is not connected fails
    /// with [`QueryError::NotConnected`].
    pub fn close(&mut self) -> Result<(), QueryError> {
        let conn = self.conn.take().ok_or(QueryError::NotConnected)?;
        conn.close().map_err(|(_, e)| QueryError::Database(e))?;
        info!("Disconnected");
        Ok(())
    }

    fn conn(&self) -> Result<&Connection, QueryError> {
        self.conn.as_ref().ok_or(QueryError::NotConnected)
    }

    /// Language codes of the `name_<lang>` columns on the city table, in
    /// column order
    pub fn supported_languages(&self) -> Result<Vec<String>, QueryError> {
        Ok(language_columns(self.conn()?, CITY_TABLE_NAME)?)
    }

    fn statement(&self, template: QueryTemplate, lang: Option<&str>) -> Result<Rc<str>, QueryError> {
        if let Some(lang) = lang {
            validate_language(lang)?;
        }

        let key = StatementKey {
            fields: self.fields.clone(),
            template,
            lang: lang.map(str::to_string),
        };

        let mut statements = self.statements.borrow_mut();
        let sql = statements
            .entry(key)
            .or_insert_with(|| {
                let sql = compile_select(&self.fields, template, lang);
                debug!(?template, lang, "compiled statement:\n{}", sql);
                Rc::from(sql)
            })
            .clone();
        Ok(sql)
    }

    fn query_rows<P: Params>(
        &self,
        template: QueryTemplate,
        lang: Option<&str>,
        params: P,
    ) -> Result<Vec<T>, QueryError> {
        let conn = self.conn()?;
        let sql = self.statement(template, lang)?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mapper = self.mapper.as_ref();

        let rows = stmt
            .query_map(params, |row| mapper(&columns, row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Prefix search over city names (alternate names included). `None`
    /// returns every match; order is whatever the index yields.
    pub fn search(
        &self,
        query: &str,
        lang: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<T>, QueryError> {
        self.conn()?;
        let Some(fts_query) = fts_prefix_query(query) else {
            return Ok(Vec::new());
        };
        self.query_rows(
            QueryTemplate::Search,
            lang,
            params![fts_query, sql_limit(limit)],
        )
    }

    /// The city with this GeoNames id, or `None`
    pub fn get_by_id(&self, geonames_id: i64, lang: Option<&str>) -> Result<Option<T>, QueryError> {
        let conn = self.conn()?;
        let sql = self.statement(QueryTemplate::ById, lang)?;
        let mut stmt = conn.prepare_cached(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mapper = self.mapper.as_ref();

        let row = stmt
            .query_row([geonames_id], |row| mapper(&columns, row))
            .optional()?;
        Ok(row)
    }

    /// Cities ordered by distance from the point; `None` means one city.
    ///
    /// Scans the whole city table.
    pub fn get_nearest(
        &self,
        latitude: f64,
        longitude: f64,
        lang: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<T>, QueryError> {
        self.query_rows(
            QueryTemplate::Nearest,
            lang,
            params![latitude, longitude, sql_limit(Some(limit.unwrap_or(1)))],
        )
    }
}

/// SQLite treats a negative LIMIT as unbounded
fn sql_limit(limit: Option<usize>) -> i64 {
    limit
        .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
        .unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CityInfo;

    #[test]
    fn test_sql_limit() {
        assert_eq!(sql_limit(None), -1);
        assert_eq!(sql_limit(Some(3)), 3);
    }

    #[test]
    fn test_reads_before_connect_fail() {
        let db = CityDatabase::<CityInfo>::new(CityField::MINIMAL, &RowMappers::default()).unwrap();
        assert!(matches!(db.supported_languages(), Err(QueryError::NotConnected)));
        assert!(matches!(db.search("Kyiv", None, None), Err(QueryError::NotConnected)));
        assert!(matches!(db.get_by_id(703448, None), Err(QueryError::NotConnected)));
        assert!(matches!(
            db.get_nearest(50.0, 30.0, None, None),
            Err(QueryError::NotConnected)
        ));
    }

    #[test]
    fn test_close_without_connection() {
        let mut db = CityDatabase::<CityInfo>::new(&[], &RowMappers::default()).unwrap();
        assert_eq!(db.fields(), &[CityField::All]);
        assert!(matches!(db.close(), Err(QueryError::NotConnected)));
    }

    #[test]
    fn test_statement_cache() {
        let db = CityDatabase::<CityInfo>::new(CityField::MINIMAL, &RowMappers::default()).unwrap();
        let first = db.statement(QueryTemplate::ById, Some("en")).unwrap();
        let second = db.statement(QueryTemplate::ById, Some("en")).unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        let other = db.statement(QueryTemplate::ById, None).unwrap();
        assert!(!Rc::ptr_eq(&first, &other));
        assert_eq!(db.statements.borrow().len(), 2);
    }

    #[test]
    fn test_invalid_language() {
        let db = CityDatabase::<CityInfo>::new(CityField::MINIMAL, &RowMappers::default()).unwrap();
        assert!(matches!(
            db.statement(QueryTemplate::ById, Some("en) --")),
            Err(QueryError::InvalidLanguage(_))
        ));
    }

    #[test]
    fn test_unknown_field_name() {
        let result = CityDatabase::<CityInfo>::from_field_names(&["id", "nickname"], &RowMappers::default());
        assert!(matches!(result, Err(QueryError::UnknownField(_))));
    }

    #[test]
    fn test_unregistered_output_type() {
        let result = CityDatabase::<String>::new(CityField::MINIMAL, &RowMappers::default());
        assert!(matches!(result, Err(QueryError::UnregisteredMapping(_))));
    }

    #[test]
    fn test_failed_connect_leaves_engine_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cities.db");
        std::fs::write(&path, "not a database\n".repeat(64)).unwrap();

        let mut db = CityDatabase::<CityInfo>::new(CityField::MINIMAL, &RowMappers::default()).unwrap();
        assert!(db.connect(&path, &ConnectOptions::default()).is_err());
        assert!(!db.is_connected());
        assert!(matches!(db.get_by_id(703448, None), Err(QueryError::NotConnected)));
    }
}
