use crate::error::Result;
use crate::renumber::parse_suffix;
use crate::scanner::{is_metadata_file, read_metadata, MetadataScanner};
use chrono::Local;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directories below the root with no files directly inside, ordered by
/// numeric suffix (unnumbered last), then path.
pub fn find_empty_folders(scanner: &MetadataScanner) -> Vec<PathBuf> {
    let mut empty: Vec<PathBuf> = scanner
        .directories()
        .filter(|dir| !has_files(dir))
        .collect();
    empty.sort_by_key(|dir| (suffix_of(dir).is_none(), suffix_of(dir), dir.clone()));
    for dir in &empty {
        info!("Empty folder: {}", dir.display());
    }
    empty
}

/// Directories that hold files but no readable metadata file.
pub fn find_folders_without_metadata(scanner: &MetadataScanner) -> Vec<PathBuf> {
    let missing: Vec<PathBuf> = scanner
        .directories()
        .filter(|dir| has_files(dir) && !has_readable_metadata(dir))
        .collect();
    info!("{} folders without metadata", missing.len());
    missing
}

fn suffix_of(dir: &Path) -> Option<u64> {
    dir.file_name().and_then(|n| n.to_str()).and_then(parse_suffix)
}

fn files_in(dir: &Path) -> impl Iterator<Item = PathBuf> {
    fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
}

fn has_files(dir: &Path) -> bool {
    files_in(dir).next().is_some()
}

fn has_readable_metadata(dir: &Path) -> bool {
    files_in(dir)
        .filter(|path| is_metadata_file(path))
        .any(|path| match read_metadata(&path) {
            Ok(_) => true,
            Err(err) => {
                warn!("Error reading metadata from {}: {}", path.display(), err);
                false
            }
        })
}

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Lowercase image extensions present anywhere in the tree.
pub fn image_types(scanner: &MetadataScanner) -> BTreeSet<String> {
    let types: BTreeSet<String> = scanner
        .files()
        .filter_map(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
        })
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .collect();
    info!("Found image types: {:?}", types);
    types
}

/// Append a timestamped header followed by one line per path.
pub fn append_paths(path: &Path, header: &str, dirs: &[PathBuf]) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "# {} ({})", header, Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    for dir in dirs {
        writeln!(writer, "{}", dir.display())?;
    }
    writer.flush()?;
    Ok(())
}
