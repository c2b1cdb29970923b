//! Ingestion pipeline tests against the fixture dumps in `tests/data`.
//!
//! Run with:
//! ```sh
//! cargo test --test pipeline_test
//! ```

mod common;

use rusqlite::{Connection, OptionalExtension};

use common::*;
use geonames_cities::language::language_columns;
use geonames_cities::writer::AlternateNameOptions;
use geonames_cities::{
    build_database, CityDatabase, CityField, CityInfo, ConnectOptions, GeonamesWriter,
    IngestError, RowMappers, SilentUi,
};

// =============================================================================
// Helpers
// =============================================================================

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

fn localized(conn: &Connection, table: &str, lang: &str, geonames_id: i64) -> Option<String> {
    conn.query_row(
        &format!("SELECT name_{lang} FROM {table} WHERE geonames_id = ?1"),
        [geonames_id],
        |row| row.get(0),
    )
    .unwrap()
}

// =============================================================================
// Full build
// =============================================================================

#[test]
fn test_build_counts() {
    let db = FixtureDatabase::build();
    let summary = &db.summary;

    assert_eq!(summary.countries, 3);
    assert_eq!(summary.administrative_units, 3);
    assert_eq!(summary.cities, 7);
    assert_eq!(summary.alternate_names, 19);
    assert_eq!(summary.indexed_cities, 7);
    assert_eq!(summary.languages, LANGUAGES);
    assert_eq!(summary.total_records(), 32);

    let conn = Connection::open(&db.path).unwrap();
    assert_eq!(count(&conn, "country"), 3);
    assert_eq!(count(&conn, "administrative_unit"), 3);
    assert_eq!(count(&conn, "city"), 7);
    assert_eq!(count(&conn, "alternate_name"), 19);
    assert_eq!(count(&conn, "city_fts"), 7);
}

#[test]
fn test_foreign_keys_resolved() {
    let db = FixtureDatabase::build();
    let conn = Connection::open(&db.path).unwrap();

    let violations: i64 = conn
        .query_row("SELECT COUNT(*) FROM pragma_foreign_key_check", [], |row| row.get(0))
        .unwrap();
    assert_eq!(violations, 0);

    let (admin_id, country_id): (Option<i64>, i64) = conn
        .query_row(
            "SELECT administrative_unit_id, country_id FROM city WHERE geonames_id = ?1",
            [WROCLAW],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(admin_id, Some(3337492));
    assert_eq!(country_id, 798544);

    let country_of_admin: i64 = conn
        .query_row(
            "SELECT country_id FROM administrative_unit WHERE key = 'UA.12'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(country_of_admin, 690791);
}

#[test]
fn test_unknown_administrative_unit_is_null() {
    let db = FixtureDatabase::build();
    let conn = Connection::open(&db.path).unwrap();

    for id in [BREMEN, BREMERHAVEN] {
        let admin_id: Option<i64> = conn
            .query_row(
                "SELECT administrative_unit_id FROM city WHERE geonames_id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(admin_id, None);
    }
}

#[test]
fn test_alternate_names_filtered() {
    let db = FixtureDatabase::build();
    let conn = Connection::open(&db.path).unwrap();

    let exists = |id: i64| -> bool {
        conn.query_row("SELECT 1 FROM alternate_name WHERE id = ?1", [id], |_| Ok(()))
            .optional()
            .unwrap()
            .is_some()
    };

    // language not requested
    assert!(!exists(8));
    assert!(!exists(33));
    // link pseudo-language
    assert!(!exists(32));
    // target id not in any table
    assert!(!exists(30));
    // untagged names are kept
    assert!(exists(31));
    // targets in each parent table
    assert!(exists(20));
    assert!(exists(10));
    assert!(exists(25));
}

#[test]
fn test_language_columns() {
    let db = FixtureDatabase::build();
    let conn = Connection::open(&db.path).unwrap();

    assert_eq!(localized(&conn, "city", "pl", WROCLAW).as_deref(), Some("Wrocław"));
    assert_eq!(localized(&conn, "city", "en", WROCLAW).as_deref(), Some("Wroclaw"));
    // the preferred uk name is historic
    assert_eq!(localized(&conn, "city", "uk", WROCLAW).as_deref(), Some("Вроцлав"));
    // two preferred ru names: lowest alternate-name id wins
    assert_eq!(localized(&conn, "city", "ru", WROCLAW).as_deref(), Some("Вроцлав"));
    assert_eq!(localized(&conn, "city", "en", BERLIN), None);

    assert_eq!(localized(&conn, "country", "uk", 798544).as_deref(), Some("Польща"));
    assert_eq!(localized(&conn, "country", "en", 798544).as_deref(), Some("Poland"));
    assert_eq!(localized(&conn, "country", "ru", 690791), None);

    assert_eq!(
        localized(&conn, "administrative_unit", "pl", 3337492).as_deref(),
        Some("Województwo dolnośląskie")
    );
    assert_eq!(
        localized(&conn, "administrative_unit", "uk", 703447).as_deref(),
        Some("Київ")
    );
}

#[test]
fn test_rebuild_replaces_contents() {
    let db = FixtureDatabase::build();

    let summary = build_database(
        &fixture_sources(),
        &db.path,
        &build_options(),
        &mut SilentUi::new(),
    )
    .unwrap();
    assert_eq!(summary, db.summary);

    let conn = Connection::open(&db.path).unwrap();
    assert_eq!(count(&conn, "city"), 7);
    assert_eq!(count(&conn, "city_fts"), 7);
}

// =============================================================================
// Individual stages
// =============================================================================

type LocalizedRows = Vec<(i64, Option<String>, Option<String>)>;

/// `(geonames_id, name_en, name_uk)` for every row of every localized table
fn snapshot(conn: &Connection) -> Vec<LocalizedRows> {
    ["country", "administrative_unit", "city"]
        .iter()
        .map(|table| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT geonames_id, name_en, name_uk FROM {table} ORDER BY geonames_id"
                ))
                .unwrap();
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
                .unwrap()
                .collect::<rusqlite::Result<LocalizedRows>>()
                .unwrap();
            rows
        })
        .collect()
}

#[test]
fn test_language_columns_are_idempotent() {
    let db = FixtureDatabase::build();
    let mut writer = GeonamesWriter::open(&db.path).unwrap();

    let languages: Vec<String> = vec!["en".into(), "uk".into()];
    writer.create_alternate_name_columns(&languages).unwrap();
    let first = snapshot(writer.connection());

    writer.create_alternate_name_columns(&languages).unwrap();
    let second = snapshot(writer.connection());

    assert_eq!(first, second);
    assert_eq!(first.iter().map(Vec::len).sum::<usize>(), 13);
    assert_eq!(localized(writer.connection(), "city", "uk", KYIV).as_deref(), Some("Київ"));
}

#[test]
fn test_language_columns_follow_latest_request() {
    let db = FixtureDatabase::build();
    let mut writer = GeonamesWriter::open(&db.path).unwrap();

    writer.create_alternate_name_columns(&["en".to_string()]).unwrap();
    for table in ["country", "administrative_unit", "city"] {
        assert_eq!(language_columns(writer.connection(), table).unwrap(), ["en"]);
    }

    writer.create_alternate_name_columns(&["de".to_string()]).unwrap();
    for table in ["country", "administrative_unit", "city"] {
        assert_eq!(language_columns(writer.connection(), table).unwrap(), ["de"]);
    }
    // Berlin's only de name was filtered out at load time
    assert_eq!(localized(writer.connection(), "city", "de", BERLIN), None);
    drop(writer);

    let mut cities = CityDatabase::<CityInfo>::new(CityField::MINIMAL, &RowMappers::default()).unwrap();
    cities.connect(&db.path, &ConnectOptions::default()).unwrap();
    assert_eq!(cities.supported_languages().unwrap(), ["de"]);
}

#[test]
fn test_add_column_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = GeonamesWriter::open(&dir.path().join("cities.db")).unwrap();
    writer.init_tables().unwrap();
    writer
        .connection()
        .execute_batch("DROP TABLE city; DROP TABLE administrative_unit;")
        .unwrap();

    let err = writer
        .create_alternate_name_columns(&["fr".to_string()])
        .unwrap_err();
    match err {
        IngestError::Schema { step, .. } => {
            assert_eq!(step, "add column administrative_unit.name_fr")
        }
        other => panic!("unexpected error: {other}"),
    }

    // the country column added before the failure was rolled back
    assert!(language_columns(writer.connection(), "country")
        .unwrap()
        .is_empty());
}

#[test]
fn test_search_index_rebuild() {
    let db = FixtureDatabase::build();
    let mut writer = GeonamesWriter::open(&db.path).unwrap();

    assert_eq!(writer.create_city_names_fts().unwrap(), 7);
    assert_eq!(writer.create_city_names_fts().unwrap(), 7);
    assert_eq!(count(writer.connection(), "city_fts"), 7);
}

#[test]
fn test_invalid_language_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = GeonamesWriter::open(&dir.path().join("cities.db")).unwrap();
    writer.init_tables().unwrap();

    let result = writer.create_alternate_name_columns(&["en; DROP TABLE city".to_string()]);
    assert!(matches!(result, Err(IngestError::Language(_))));
}

#[test]
fn test_unresolved_country_for_administrative_unit() {
    let dir = tempfile::tempdir().unwrap();
    let sources = sources_with(
        dir.path(),
        "admin1CodesASCII.txt",
        "PL.72\tLower Silesia\tLower Silesia\t3337492\nXX.01\tNowhere\tNowhere\t1\n",
    );

    let err = build_database(
        &sources,
        &dir.path().join("cities.db"),
        &build_options(),
        &mut SilentUi::new(),
    )
    .unwrap_err();

    match err {
        IngestError::UnresolvedCountry { table, line, iso } => {
            assert_eq!(table, "administrative_unit");
            assert_eq!(line, 2);
            assert_eq!(iso, "XX");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_failed_file_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let sources = sources_with(
        dir.path(),
        "cities15000.txt",
        concat!(
            "3081368\tWrocław\tWroclaw\t\t51.1\t17.03333\tP\tPPLA\tPL\t\t72\t\t\t\t634893\t\t120\tEurope/Warsaw\t2024-01-01\n",
            "1\tAtlantis\tAtlantis\t\t0\t0\tP\tPPL\tXX\t\t\t\t\t\t0\t\t0\tUTC\t2024-01-01\n",
        ),
    );

    let mut writer = GeonamesWriter::open(&dir.path().join("cities.db")).unwrap();
    let mut ui = SilentUi::new();
    writer.init_tables().unwrap();
    writer.load_countries(&sources.countries, &mut ui).unwrap();
    writer
        .load_administrative_units(&sources.administrative_units, &mut ui)
        .unwrap();

    let err = writer.load_cities(&sources.cities, &mut ui).unwrap_err();
    assert!(matches!(err, IngestError::UnresolvedCountry { line: 2, .. }));
    assert_eq!(count(writer.connection(), "city"), 0);
    assert_eq!(count(writer.connection(), "country"), 3);
}

#[test]
fn test_malformed_number_reported() {
    let dir = tempfile::tempdir().unwrap();
    let sources = sources_with(
        dir.path(),
        "cities15000.txt",
        "703448\tKyiv\tKyiv\t\tnorth\t30.5238\tP\tPPLC\tUA\t\t12\t\t\t\t2797553\t\t187\tEurope/Kyiv\t2024-01-01\n",
    );

    let mut writer = GeonamesWriter::open(&dir.path().join("cities.db")).unwrap();
    let mut ui = SilentUi::new();
    writer.init_tables().unwrap();
    writer.load_countries(&sources.countries, &mut ui).unwrap();

    let err = writer.load_cities(&sources.cities, &mut ui).unwrap_err();
    match err {
        IngestError::InvalidValue { column, value, .. } => {
            assert_eq!(column, "latitude");
            assert_eq!(value, "north");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_alternate_names_without_languages_keep_untagged_only() {
    let db = FixtureDatabase::build();
    let mut writer = GeonamesWriter::open(&db.path).unwrap();

    writer
        .connection()
        .execute("DELETE FROM alternate_name", [])
        .unwrap();
    let loaded = writer
        .load_alternate_names(
            &fixture_sources().alternate_names,
            &AlternateNameOptions::default(),
            &mut SilentUi::new(),
        )
        .unwrap();
    assert_eq!(loaded, 1);
}
