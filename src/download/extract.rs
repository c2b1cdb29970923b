use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use zip::ZipArchive;

use crate::ui::{Phase, Ui};

/// Extract the `.txt` members of a zip file into the destination directory
pub fn extract_zip(zip_path: &Path, dest_dir: &Path, ui: &mut impl Ui) -> Result<()> {
    let file = File::open(zip_path).context("Failed to open zip file")?;
    let reader = BufReader::new(file);
    let mut archive = ZipArchive::new(reader).context("Failed to read zip archive")?;

    fs::create_dir_all(dest_dir).context("Failed to create destination directory")?;

    ui.set_phase(Phase::Extracting);
    let total_files = archive.len() as u64;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .context("Failed to read file from archive")?;

        // Get the file name, stripping any directory prefix
        let name = file.name();
        let file_name = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name)
            .to_string();

        if !file_name.ends_with(".txt") {
            continue;
        }

        let dest_path = dest_dir.join(&file_name);
        let mut dest_file = File::create(&dest_path)
            .with_context(|| format!("Failed to create file: {:?}", dest_path))?;

        io::copy(&mut file, &mut dest_file)
            .with_context(|| format!("Failed to extract: {}", file_name))?;

        ui.set_progress(i as u64 + 1, total_files, file_name);
    }

    ui.clear_progress();
    ui.log(format!("Extracted {:?}", zip_path));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::SilentUi;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    #[test]
    fn test_extracts_only_text_members() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("cities15000.zip");

        let mut writer = zip::ZipWriter::new(File::create(&zip_path).unwrap());
        writer
            .start_file("cities15000.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"3081368\tWroclaw\n").unwrap();
        writer
            .start_file("readme.md", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"ignored").unwrap();
        writer.finish().unwrap();

        let out = dir.path().join("out");
        extract_zip(&zip_path, &out, &mut SilentUi::new()).unwrap();

        assert_eq!(
            fs::read_to_string(out.join("cities15000.txt")).unwrap(),
            "3081368\tWroclaw\n"
        );
        assert!(!out.join("readme.md").exists());
    }
}
