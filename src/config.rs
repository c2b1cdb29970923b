//! Static configuration: source locations, table names and defaults

use anyhow::{Context, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use std::path::PathBuf;

pub const GEONAMES_URL: &str = "https://download.geonames.org/export/dump/";

pub const COUNTRIES_FILENAME: &str = "countryInfo.txt";
pub const ADMINISTRATIVE_FILENAME: &str = "admin1CodesASCII.txt";
pub const ALTERNATE_NAMES_FILENAME: &str = "alternateNamesV2.txt";
pub const ALTERNATE_NAMES_ARCHIVE_FILENAME: &str = "alternateNamesV2.zip";

pub const COUNTRY_TABLE_NAME: &str = "country";
pub const ADMINISTRATIVE_TABLE_NAME: &str = "administrative_unit";
pub const CITY_TABLE_NAME: &str = "city";
pub const CITY_FTS_TABLE_NAME: &str = "city_fts";
pub const ALTERNATE_NAME_TABLE_NAME: &str = "alternate_name";

pub const DATABASE_FILENAME: &str = "cities.db";

const APP_NAME: &str = "geonames-cities";

/// Which GeoNames city dump to ingest (minimum population per city)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CitySet {
    Cities500,
    Cities1000,
    Cities5000,
    #[default]
    Cities15000,
}

impl CitySet {
    fn stem(&self) -> &'static str {
        match self {
            CitySet::Cities500 => "cities500",
            CitySet::Cities1000 => "cities1000",
            CitySet::Cities5000 => "cities5000",
            CitySet::Cities15000 => "cities15000",
        }
    }

    pub fn filename(&self) -> String {
        format!("{}.txt", self.stem())
    }

    pub fn archive_filename(&self) -> String {
        format!("{}.zip", self.stem())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME).context("Could not determine home directory")
}

/// Default location for downloaded dumps
pub fn default_cache_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.cache_dir().to_path_buf())
}

/// Default location of the built database
pub fn default_database_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join(DATABASE_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_set_filenames() {
        assert_eq!(CitySet::default().filename(), "cities15000.txt");
        assert_eq!(CitySet::Cities500.archive_filename(), "cities500.zip");
    }
}
