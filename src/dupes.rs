use crate::error::Result;
use crate::permalink::Shortcode;
use crate::progress::ProgressReporter;
use crate::scanner::{self, MetadataScanner, ScanRecord};
use chrono::Local;
use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub type DuplicateGroups = BTreeMap<Shortcode, Vec<PathBuf>>;

/// Which directory of a duplicate group survives removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeepPolicy {
    /// Lexicographically first path.
    #[default]
    FirstPath,
    /// Directory with the most entries; ties go to the first path.
    MostFiles,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemovalSummary {
    pub groups: usize,
    pub removed: Vec<PathBuf>,
    pub kept: Vec<PathBuf>,
    pub missing: usize,
    pub failed: usize,
}

/// Group directories by shortcode. Each list is sorted and deduplicated so a
/// directory with two metadata files for the same post counts once.
pub fn group_by_shortcode<I>(records: I) -> BTreeMap<Shortcode, Vec<PathBuf>>
where
    I: IntoIterator<Item = ScanRecord>,
{
    let mut groups: BTreeMap<Shortcode, Vec<PathBuf>> = BTreeMap::new();
    for record in records {
        groups.entry(record.shortcode).or_default().push(record.directory);
    }
    for dirs in groups.values_mut() {
        dirs.sort();
        dirs.dedup();
    }
    groups
}

/// Shortcodes found in more than one directory. Metadata files are decoded
/// on the rayon pool; the result is sorted so it doesn't depend on
/// completion order.
pub fn find_duplicates(scanner: &MetadataScanner) -> DuplicateGroups {
    let map: DashMap<Shortcode, Vec<PathBuf>> = DashMap::new();

    let files: Vec<PathBuf> = scanner.metadata_files().collect();
    files.par_iter().for_each(|path| {
        if let Some(record) = scanner::decode_record(path) {
            map.entry(record.shortcode).or_default().push(record.directory);
        }
    });

    let duplicates: DuplicateGroups = map
        .into_iter()
        .filter_map(|(code, mut dirs)| {
            dirs.sort();
            dirs.dedup();
            (dirs.len() > 1).then_some((code, dirs))
        })
        .collect();

    info!("Number of duplicate urls: {}", duplicates.len());
    duplicates
}

/// Pick the surviving directory of a sorted group.
pub fn choose_keep(dirs: &[PathBuf], policy: KeepPolicy) -> Option<&PathBuf> {
    match policy {
        KeepPolicy::FirstPath => dirs.first(),
        KeepPolicy::MostFiles => dirs
            .iter()
            .enumerate()
            .max_by_key(|(i, dir)| (entry_count(dir), std::cmp::Reverse(*i)))
            .map(|(_, dir)| dir),
    }
}

fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

/// Delete every directory of each duplicate group except the one `policy`
/// keeps. Removal is recursive and irreversible unless `dry_run` is set.
/// Directories that have vanished or fail to delete are logged and counted;
/// the batch always runs to the end.
pub fn remove_duplicates(
    groups: &DuplicateGroups,
    policy: KeepPolicy,
    dry_run: bool,
    reporter: &dyn ProgressReporter,
) -> RemovalSummary {
    let start = Instant::now();
    let mut summary = RemovalSummary {
        groups: groups.len(),
        ..Default::default()
    };

    let total: usize = groups.values().map(|dirs| dirs.len().saturating_sub(1)).sum();
    reporter.on_remove_start(total);
    let mut done = 0;

    for (code, dirs) in groups {
        let mut sorted = dirs.clone();
        sorted.sort();
        let Some(keep) = choose_keep(&sorted, policy).cloned() else {
            continue;
        };
        info!("{}: keeping {}", code, keep.display());

        for dir in sorted.iter().filter(|d| **d != keep) {
            done += 1;
            reporter.on_remove_progress(done, total);

            if !dir.exists() {
                warn!("Path does not exist: {}", dir.display());
                summary.missing += 1;
                continue;
            }
            if dry_run {
                info!("Would remove duplicate folder: {}", dir.display());
                summary.removed.push(dir.clone());
                continue;
            }
            match fs::remove_dir_all(dir) {
                Ok(()) => {
                    info!("Removed duplicate folder: {}", dir.display());
                    summary.removed.push(dir.clone());
                }
                Err(err) => {
                    error!("Error removing folder {}: {}", dir.display(), err);
                    summary.failed += 1;
                }
            }
        }
        summary.kept.push(keep);
    }

    debug!("{:?}", summary);
    reporter.on_remove_complete(summary.removed.len(), start.elapsed().as_secs_f64());
    summary
}

/// Append a timestamped block listing each group as `permalink -> [dirs]`.
pub fn write_duplicates_report(path: &Path, groups: &DuplicateGroups) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "# {} duplicate groups at {}",
        groups.len(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    for (code, dirs) in groups {
        let dirs: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
        writeln!(writer, "{} -> [{}]", code.permalink(), dirs.join(", "))?;
        writeln!(writer, "------------------------")?;
    }
    writer.flush()?;
    Ok(())
}
