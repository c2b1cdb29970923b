//! Shared fixture: a small hand-made extract of the GeoNames dumps in
//! `tests/data`, built into a temporary database.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use geonames_cities::config::CitySet;
use geonames_cities::download::{resolve_sources, LocalDir};
use geonames_cities::{build_database, BuildOptions, BuildSummary, SilentUi, SourceFiles};

/// Languages the fixture database is built with, in materialization order
pub const LANGUAGES: [&str; 4] = ["uk", "pl", "en", "ru"];

pub const WROCLAW: i64 = 3081368;
pub const STARE_MIASTO: i64 = 12047628;
pub const SRODMIESCIE: i64 = 12047644;
pub const KYIV: i64 = 703448;
pub const BERLIN: i64 = 2950159;
pub const BREMEN: i64 = 2944388;
pub const BREMERHAVEN: i64 = 2944368;

pub fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

pub fn fixture_sources() -> SourceFiles {
    let mut ui = SilentUi::new();
    let mut source = LocalDir::new(data_dir(), &mut ui);
    resolve_sources(&mut source, CitySet::Cities15000).expect("fixture dumps are present")
}

pub fn build_options() -> BuildOptions {
    BuildOptions {
        languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
    }
}

/// A database built from the fixture dumps; deleted on drop
pub struct FixtureDatabase {
    _dir: TempDir,
    pub path: PathBuf,
    pub summary: BuildSummary,
}

impl FixtureDatabase {
    pub fn build() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("cities.db");

        let summary = build_database(
            &fixture_sources(),
            &path,
            &build_options(),
            &mut SilentUi::new(),
        )
        .expect("Failed to build fixture database");

        Self {
            _dir: dir,
            path,
            summary,
        }
    }
}

/// Copy the fixture dumps into `dir`, replacing one of them with `contents`
pub fn sources_with(dir: &Path, filename: &str, contents: &str) -> SourceFiles {
    for entry in std::fs::read_dir(data_dir()).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), dir.join(entry.file_name())).unwrap();
    }
    std::fs::write(dir.join(filename), contents).unwrap();

    let mut ui = SilentUi::new();
    let mut source = LocalDir::new(dir, &mut ui);
    resolve_sources(&mut source, CitySet::Cities15000).unwrap()
}
