//! Locates where a re-run of the downloader started repeating earlier posts.
//!
//! The caption of a known early post is searched for in every post folder's
//! `.txt` files. The numbered folders that match show where each repeated
//! run began; the last match is where renumbering should start.

use crate::renumber::parse_suffix;
use crate::scanner::MetadataScanner;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepeatPoint {
    /// Suffixes of folders whose caption contains the needle, ascending.
    pub matches: Vec<u64>,
    /// Adjacent matches with the widest gap between them.
    pub largest_gap: Option<(u64, u64)>,
    /// Last matching suffix, the `start` to hand to renumbering.
    pub suggested_start: Option<u64>,
}

pub fn find_repeat_point(scanner: &MetadataScanner, needle: &str) -> RepeatPoint {
    let mut matches: Vec<u64> = scanner
        .directories()
        .filter_map(|dir| {
            let suffix = dir.file_name().and_then(|n| n.to_str()).and_then(parse_suffix)?;
            caption_contains(&dir, needle).then_some(suffix)
        })
        .collect();
    matches.sort_unstable();
    matches.dedup();

    let largest_gap = largest_gap(&matches);
    if let Some((a, b)) = largest_gap {
        info!("Largest gap between {} and {}", a, b);
    }

    let suggested_start = matches.last().copied();
    info!(
        "{} folders repeat the caption, suggested start {:?}",
        matches.len(),
        suggested_start
    );

    RepeatPoint {
        matches,
        largest_gap,
        suggested_start,
    }
}

fn largest_gap(sorted: &[u64]) -> Option<(u64, u64)> {
    let mut best: Option<(u64, u64)> = None;
    for pair in sorted.windows(2) {
        let wider = match best {
            Some((a, b)) => pair[1] - pair[0] > b - a,
            None => true,
        };
        if wider {
            best = Some((pair[0], pair[1]));
        }
    }
    best
}

fn caption_contains(dir: &Path, needle: &str) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("txt"))
        .any(|path| match fs::read_to_string(&path) {
            Ok(content) => {
                let found = content.contains(needle);
                if found {
                    debug!("Match found in: {}", path.display());
                }
                found
            }
            Err(err) => {
                warn!("Error reading file {}: {}", path.display(), err);
                false
            }
        })
}
