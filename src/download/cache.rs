use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::default_cache_dir;

/// Directory holding downloaded and extracted dumps
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let cache_dir = match custom_dir {
            Some(dir) => dir,
            None => default_cache_dir()?,
        };

        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {:?}", cache_dir))?;

        Ok(Self { cache_dir })
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    /// Check if a file is already cached
    pub fn is_cached(&self, filename: &str) -> bool {
        self.file_path(filename).is_file()
    }

    /// Remove downloaded archives once their contents are extracted
    pub fn remove_archive(&self, filename: &str) -> Result<()> {
        let path = self.file_path(filename);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        }
        Ok(())
    }
}
