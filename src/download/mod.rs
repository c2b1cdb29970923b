//! Delivery of the GeoNames dumps as local files

pub mod cache;
pub mod client;
pub mod extract;

pub use cache::*;
pub use client::*;
pub use extract::*;

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::config::{
    CitySet, ADMINISTRATIVE_FILENAME, ALTERNATE_NAMES_ARCHIVE_FILENAME, ALTERNATE_NAMES_FILENAME,
    COUNTRIES_FILENAME,
};
use crate::ui::{Phase, Ui};
use crate::writer::SourceFiles;

/// One of the four dumps the pipeline consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Countries,
    AdministrativeUnits,
    Cities(CitySet),
    AlternateNames,
}

impl Dataset {
    /// Name of the tab-separated file
    pub fn filename(&self) -> String {
        match self {
            Dataset::Countries => COUNTRIES_FILENAME.to_string(),
            Dataset::AdministrativeUnits => ADMINISTRATIVE_FILENAME.to_string(),
            Dataset::Cities(set) => set.filename(),
            Dataset::AlternateNames => ALTERNATE_NAMES_FILENAME.to_string(),
        }
    }

    /// Name of the zip the file is published in, if it is zipped upstream
    pub fn archive_filename(&self) -> Option<String> {
        match self {
            Dataset::Countries | Dataset::AdministrativeUnits => None,
            Dataset::Cities(set) => Some(set.archive_filename()),
            Dataset::AlternateNames => Some(ALTERNATE_NAMES_ARCHIVE_FILENAME.to_string()),
        }
    }
}

/// Hands the pipeline a local readable path per dataset
pub trait FileSource {
    fn fetch(&mut self, dataset: Dataset) -> Result<PathBuf>;
}

/// A directory that already holds the dumps. Archives found there are
/// unpacked next to themselves.
pub struct LocalDir<'a, U: Ui> {
    dir: PathBuf,
    ui: &'a mut U,
}

impl<'a, U: Ui> LocalDir<'a, U> {
    pub fn new(dir: impl Into<PathBuf>, ui: &'a mut U) -> Self {
        Self {
            dir: dir.into(),
            ui,
        }
    }
}

impl<U: Ui> FileSource for LocalDir<'_, U> {
    fn fetch(&mut self, dataset: Dataset) -> Result<PathBuf> {
        let path = self.dir.join(dataset.filename());
        if path.is_file() {
            return Ok(path);
        }

        if let Some(archive) = dataset.archive_filename() {
            let archive_path = self.dir.join(&archive);
            if archive_path.is_file() {
                extract_zip(&archive_path, &self.dir, &mut *self.ui)?;
                if path.is_file() {
                    return Ok(path);
                }
                bail!("{:?} does not contain {}", archive_path, dataset.filename());
            }
        }

        bail!("{} not found in {:?}", dataset.filename(), self.dir)
    }
}

/// Downloads dumps from GeoNames into a cache directory
pub struct GeonamesDownloader<'a, U: Ui> {
    client: GeonamesClient,
    cache: CacheManager,
    force: bool,
    ui: &'a mut U,
}

impl<'a, U: Ui> GeonamesDownloader<'a, U> {
    pub fn new(client: GeonamesClient, cache: CacheManager, force: bool, ui: &'a mut U) -> Self {
        Self {
            client,
            cache,
            force,
            ui,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.cache_dir()
    }
}

impl<U: Ui> FileSource for GeonamesDownloader<'_, U> {
    fn fetch(&mut self, dataset: Dataset) -> Result<PathBuf> {
        let filename = dataset.filename();
        if !self.force && self.cache.is_cached(&filename) {
            self.ui.log(format!("Using cached {}", filename));
            return Ok(self.cache.file_path(&filename));
        }

        self.ui.set_phase(Phase::Downloading);
        match dataset.archive_filename() {
            Some(archive) => {
                let archive_path =
                    self.client
                        .download_file(&archive, self.cache.cache_dir(), &mut *self.ui)?;
                extract_zip(&archive_path, self.cache.cache_dir(), &mut *self.ui)?;
                self.cache.remove_archive(&archive)?;

                if !self.cache.is_cached(&filename) {
                    bail!("{} does not contain {}", archive, filename);
                }
                Ok(self.cache.file_path(&filename))
            }
            None => self
                .client
                .download_file(&filename, self.cache.cache_dir(), &mut *self.ui),
        }
    }
}

/// Fetch all four dumps in load order
pub fn resolve_sources(source: &mut impl FileSource, cities: CitySet) -> Result<SourceFiles> {
    Ok(SourceFiles {
        countries: source.fetch(Dataset::Countries)?,
        administrative_units: source.fetch(Dataset::AdministrativeUnits)?,
        cities: source.fetch(Dataset::Cities(cities))?,
        alternate_names: source.fetch(Dataset::AlternateNames)?,
    })
}
