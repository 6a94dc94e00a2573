//! Metadata scanner: walks a download tree and yields one [`ScanRecord`]
//! per readable metadata file.

pub mod metadata;

use crate::error::{Error, Result};
use crate::permalink::Shortcode;
use crate::progress::ProgressReporter;
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

pub use metadata::{is_metadata_file, read_metadata, Compression, PostMetadata};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub shortcode: Shortcode,
    /// Post directory holding the metadata file.
    pub directory: PathBuf,
    pub metadata_path: PathBuf,
    pub comment_count: Option<u64>,
}

impl ScanRecord {
    pub fn permalink(&self) -> String {
        self.shortcode.permalink()
    }
}

#[derive(Debug, Clone)]
pub struct MetadataScanner {
    root: PathBuf,
    ignore_patterns: Vec<Pattern>,
}

impl MetadataScanner {
    /// Fails only when `root` is not a directory. Invalid ignore globs are
    /// logged and dropped.
    pub fn new(root: impl Into<PathBuf>, ignore_globs: &[String]) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::MissingRoot(root));
        }

        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Ok(Self {
            root,
            ignore_patterns,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }

    /// Every path under the root (root included), in file-name order, with
    /// ignored subtrees pruned. Unreadable entries are logged and skipped.
    fn walk(&self) -> impl Iterator<Item = walkdir::DirEntry> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !self.is_ignored(entry.path()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    None
                }
            })
    }

    /// All regular files in the tree.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.walk()
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
    }

    /// All metadata files in the tree.
    pub fn metadata_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.walk()
            .filter(|entry| entry.file_type().is_file() && is_metadata_file(entry.path()))
            .map(|entry| entry.into_path())
    }

    /// All directories below the root.
    pub fn directories(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.walk()
            .filter(|entry| entry.depth() > 0 && entry.file_type().is_dir())
            .map(|entry| entry.into_path())
    }

    /// Lazily decode every metadata file. Corrupt files are logged and
    /// skipped.
    pub fn records(&self) -> impl Iterator<Item = ScanRecord> + '_ {
        self.metadata_files().filter_map(|path| decode_record(&path))
    }

    /// Decode the whole tree, reporting progress as records arrive.
    pub fn collect_records(&self, reporter: &dyn ProgressReporter) -> Vec<ScanRecord> {
        let start = Instant::now();
        reporter.on_scan_start();
        let mut records = Vec::new();
        for record in self.records() {
            reporter.on_scan_progress(records.len() + 1, &record.directory.to_string_lossy());
            records.push(record);
        }
        reporter.on_scan_complete(records.len(), start.elapsed().as_secs_f64());
        records
    }
}

/// Read one metadata file into a record, logging and discarding failures.
pub fn decode_record(path: &Path) -> Option<ScanRecord> {
    match read_metadata(path) {
        Ok(meta) => {
            let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
            debug!("{} -> {}", meta.shortcode, directory.display());
            Some(ScanRecord {
                shortcode: meta.shortcode,
                directory,
                metadata_path: path.to_path_buf(),
                comment_count: meta.comment_count,
            })
        }
        Err(err) => {
            error!("Error processing {}: {}", path.display(), err);
            None
        }
    }
}
