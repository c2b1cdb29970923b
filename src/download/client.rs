use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::GEONAMES_URL;
use crate::ui::Ui;

pub struct GeonamesClient {
    client: Client,
    base_url: String,
}

impl GeonamesClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(GEONAMES_URL)
    }

    /// Client for a mirror of the GeoNames export directory
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("geonames-cities/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { client, base_url })
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}{}", self.base_url, filename)
    }

    /// Download `filename` from the base URL into `directory`
    pub fn download_file(
        &self,
        filename: &str,
        directory: &Path,
        ui: &mut impl Ui,
    ) -> Result<PathBuf> {
        let url = self.url_for(filename);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Failed to start download of {}", url))?;

        if !response.status().is_success() {
            bail!("Download of {} failed with status {}", url, response.status());
        }

        let total_size = response.content_length().unwrap_or(0);
        let dest = directory.join(filename);
        let partial = directory.join(format!("{filename}.part"));

        // The final path only ever holds a complete transfer
        if let Err(e) = write_response(response, &partial, total_size, filename, &mut *ui) {
            let _ = fs::remove_file(&partial);
            ui.clear_progress();
            return Err(e);
        }
        fs::rename(&partial, &dest)
            .with_context(|| format!("Failed to move {:?} to {:?}", partial, dest))?;

        ui.clear_progress();
        ui.log(format!("Downloaded {}", filename));
        Ok(dest)
    }
}

fn write_response(
    mut reader: Response,
    path: &Path,
    total_size: u64,
    filename: &str,
    ui: &mut impl Ui,
) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .context("Failed to read from response")?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .context("Failed to write to file")?;

        downloaded += bytes_read as u64;
        ui.set_progress(
            downloaded,
            total_size,
            format!("{} {}", filename, format_bytes(downloaded, total_size)),
        );
    }

    if total_size > 0 && downloaded < total_size {
        bail!("Download of {} ended after {} of {} bytes", filename, downloaded, total_size);
    }
    file.flush().context("Failed to write to file")?;
    Ok(())
}

/// Format bytes as human-readable string
fn format_bytes(current: u64, total: u64) -> String {
    fn fmt(bytes: u64) -> String {
        if bytes >= 1_000_000_000 {
            format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
        } else if bytes >= 1_000_000 {
            format!("{:.1} MB", bytes as f64 / 1_000_000.0)
        } else if bytes >= 1_000 {
            format!("{:.1} KB", bytes as f64 / 1_000.0)
        } else {
            format!("{} B", bytes)
        }
    }
    format!("{} / {}", fmt(current), fmt(total))
}
