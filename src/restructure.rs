//! Gathers flat downloads into one folder per post.
//!
//! Files sharing a timestamp prefix belong to one post. A group is moved
//! only when it carries both an image and a caption, into
//! `<destination>/<prefix>_<n>` with `n` counting the moved groups from 0.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Number of `_`-separated name parts forming the prefix, e.g.
/// `profile_2024-01-01_12-00-00_UTC`.
pub const PREFIX_PARTS: usize = 4;

const REQUIRED_EXTENSIONS: [&str; 2] = ["jpg", "txt"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestructureSummary {
    /// Post folders created or reused.
    pub folders: Vec<PathBuf>,
    pub moved: usize,
    /// Files left in place because the target existed or the move failed.
    pub skipped: Vec<PathBuf>,
    /// Groups missing an image or a caption.
    pub incomplete: usize,
}

/// The post prefix of a downloaded file name. `.json.xz` style names lose
/// both extensions.
pub fn group_prefix(file_name: &str) -> String {
    let mut stem = strip_extension(file_name);
    if file_name.contains("json") {
        stem = strip_extension(stem);
    }
    stem.split('_').take(PREFIX_PARTS).collect::<Vec<_>>().join("_")
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// True when `dir` is already the `<prefix>_<n>` folder of `prefix`.
fn is_post_folder(dir: &Path, prefix: &str) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix(prefix))
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Files under `source` grouped by (directory, prefix). Files already sitting
/// in their own post folder are left out.
pub fn plan_groups(source: &Path) -> Result<BTreeMap<(PathBuf, String), Vec<PathBuf>>> {
    if !source.is_dir() {
        return Err(Error::MissingRoot(source.to_path_buf()));
    }

    let mut groups: BTreeMap<(PathBuf, String), Vec<PathBuf>> = BTreeMap::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let prefix = group_prefix(&entry.file_name().to_string_lossy());
        let dir = entry.path().parent().map(Path::to_path_buf).unwrap_or_default();
        if is_post_folder(&dir, &prefix) {
            continue;
        }
        groups.entry((dir, prefix)).or_default().push(entry.into_path());
    }
    Ok(groups)
}

/// Move every complete group under `source` into its own folder below
/// `destination`. Existing files are never overwritten.
pub fn restructure(source: &Path, destination: &Path) -> Result<RestructureSummary> {
    let groups = plan_groups(source)?;
    let mut summary = RestructureSummary::default();

    for ((_, prefix), files) in &groups {
        let complete = REQUIRED_EXTENSIONS
            .iter()
            .all(|required| files.iter().any(|f| extension(f).as_deref() == Some(*required)));
        if !complete {
            debug!("Leaving incomplete group {} in place", prefix);
            summary.incomplete += 1;
            continue;
        }

        let folder = destination.join(format!("{}_{}", prefix, summary.folders.len()));
        fs::create_dir_all(&folder)?;

        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let target = folder.join(name);
            if target.exists() {
                warn!("{} already exists, skipping", target.display());
                summary.skipped.push(file.clone());
                continue;
            }
            match fs::rename(file, &target) {
                Ok(()) => summary.moved += 1,
                Err(err) => {
                    error!("Error moving {}: {}", file.display(), err);
                    summary.skipped.push(file.clone());
                }
            }
        }
        debug!("Moved {} group to {}", prefix, folder.display());
        summary.folders.push(folder);
    }

    info!(
        "{} groups moved, {} files, {} skipped, {} incomplete of {} groups",
        summary.folders.len(),
        summary.moved,
        summary.skipped.len(),
        summary.incomplete,
        groups.len()
    );
    Ok(summary)
}
