//! Persisted shortcode ↔ number index.
//!
//! Folder names carry a numeric suffix, but the index file written next to
//! them is the record of which post each number belongs to. It is rebuilt
//! from the tree after every renumber or rename.

use crate::error::Result;
use crate::permalink::Shortcode;
use crate::renumber::parse_suffix;
use crate::scanner::MetadataScanner;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Numeric suffix of the folder, if it has one.
    pub number: Option<u64>,
    pub shortcode: Shortcode,
    /// Folder name relative to the download root.
    pub directory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostIndex {
    pub entries: Vec<IndexEntry>,
}

impl PostIndex {
    /// One entry per readable metadata file, ordered by number then folder.
    pub fn build(scanner: &MetadataScanner) -> Self {
        let root = scanner.root().to_path_buf();
        let mut entries: Vec<IndexEntry> = scanner
            .records()
            .filter_map(|record| {
                let relative = match record.directory.strip_prefix(&root) {
                    Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
                    _ => {
                        warn!(
                            "Metadata outside a post folder: {}",
                            record.metadata_path.display()
                        );
                        return None;
                    }
                };
                let number = relative
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(parse_suffix);
                Some(IndexEntry {
                    number,
                    shortcode: record.shortcode,
                    directory: relative.to_string_lossy().into_owned(),
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            (a.number.is_none(), a.number, &a.directory).cmp(&(
                b.number.is_none(),
                b.number,
                &b.directory,
            ))
        });
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let entries = reader
            .deserialize::<IndexEntry>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        info!("Wrote {} index entries to {}", self.entries.len(), path.display());
        Ok(())
    }

    pub fn lookup(&self, shortcode: &Shortcode) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| &e.shortcode == shortcode)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rebuild the index from `scanner`'s tree and write it to `path`.
pub fn refresh(scanner: &MetadataScanner, path: &Path) -> Result<PostIndex> {
    let index = PostIndex::build(scanner);
    index.save(path)?;
    Ok(index)
}
