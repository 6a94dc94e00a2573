use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::scanner::MetadataScanner;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenameSummary {
    pub renamed: usize,
    pub unchanged: usize,
    pub skipped: Vec<PathBuf>,
}

/// Digits after the last `-` of a folder name: `Post(F_6)-12` → `12`.
pub fn parse_suffix(name: &str) -> Option<u64> {
    let (_, digits) = name.rsplit_once('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn with_suffix(name: &str, prefix: Option<&str>, suffix: u64) -> Option<String> {
    let (current, _) = name.rsplit_once('-')?;
    Some(format!("{}-{}", prefix.unwrap_or(current), suffix))
}

/// Direct subdirectories of `root` whose suffix lies in `[start, end]`,
/// ascending by suffix, each mapped to its 1-based rank in that order.
pub fn plan_renumber(root: &Path, start: u64, end: u64) -> Result<Vec<RenamePlan>> {
    plan_renumber_as(root, start, end, None)
}

/// Like [`plan_renumber`], but `prefix` replaces everything before the last
/// `-`, so `Post(F_6)-7` becomes `Post-1` with a prefix of `Post`.
pub fn plan_renumber_as(
    root: &Path,
    start: u64,
    end: u64,
    prefix: Option<&str>,
) -> Result<Vec<RenamePlan>> {
    if start > end {
        return Err(Error::InvalidRange { start, end });
    }
    if !root.is_dir() {
        return Err(Error::MissingRoot(root.to_path_buf()));
    }

    let mut candidates: Vec<(u64, String)> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(suffix) = parse_suffix(&name).filter(|s| (start..=end).contains(s)) {
            candidates.push((suffix, name));
        }
    }
    candidates.sort();

    Ok(candidates
        .into_iter()
        .zip(1u64..)
        .filter_map(|((_, name), rank)| {
            with_suffix(&name, prefix, rank).map(|target| RenamePlan {
                from: root.join(&name),
                to: root.join(target),
            })
        })
        .collect())
}

/// Renumber the folders with suffixes in `[start, end]` onto `1..=N`,
/// keeping their relative order.
pub fn renumber(
    root: &Path,
    start: u64,
    end: u64,
    reporter: &dyn ProgressReporter,
) -> Result<RenameSummary> {
    renumber_as(root, start, end, None, reporter)
}

/// Renumber, optionally normalising every prefix to `prefix`. Targets that
/// are still held by another folder of the same run are freed first; a
/// target held by any other folder is skipped and logged, never overwritten.
pub fn renumber_as(
    root: &Path,
    start: u64,
    end: u64,
    prefix: Option<&str>,
    reporter: &dyn ProgressReporter,
) -> Result<RenameSummary> {
    let plan = plan_renumber_as(root, start, end, prefix)?;
    info!(
        "Renumbering {} folders with suffixes {}..={} in {}",
        plan.len(),
        start,
        end,
        root.display()
    );
    Ok(apply_staged(&plan, reporter))
}

/// Rename every post folder to the shortcode its metadata names. Deepest
/// folders go first so parent renames don't invalidate pending paths.
pub fn rename_to_shortcodes(
    scanner: &MetadataScanner,
    reporter: &dyn ProgressReporter,
) -> RenameSummary {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut plan: Vec<RenamePlan> = scanner
        .records()
        .filter(|record| record.directory != scanner.root())
        .filter(|record| seen.insert(record.directory.clone()))
        .filter_map(|record| {
            let parent = record.directory.parent()?;
            Some(RenamePlan {
                to: parent.join(record.shortcode.as_str()),
                from: record.directory,
            })
        })
        .collect();

    plan.sort_by_key(|p| std::cmp::Reverse(p.from.components().count()));
    apply(&plan, reporter)
}

fn apply(plan: &[RenamePlan], reporter: &dyn ProgressReporter) -> RenameSummary {
    let start = Instant::now();
    let mut summary = RenameSummary::default();
    reporter.on_rename_start(plan.len());

    for (i, step) in plan.iter().enumerate() {
        reporter.on_rename_progress(i + 1, plan.len());

        if step.from == step.to {
            summary.unchanged += 1;
            continue;
        }
        if step.to.exists() {
            log_collision(step);
            summary.skipped.push(step.from.clone());
            continue;
        }
        match fs::rename(&step.from, &step.to) {
            Ok(()) => {
                debug!("Renamed {} → {}", step.from.display(), step.to.display());
                summary.renamed += 1;
            }
            Err(err) => {
                error!("Error renaming {}: {}", step.from.display(), err);
                summary.skipped.push(step.from.clone());
            }
        }
    }

    finish(summary, start, reporter)
}

/// Two-pass rename for flat plans whose targets may be other entries'
/// sources: every folder first moves to a staging name, then to its target.
fn apply_staged(plan: &[RenamePlan], reporter: &dyn ProgressReporter) -> RenameSummary {
    let start = Instant::now();
    let mut summary = RenameSummary::default();
    let total = plan.len();
    let mut done = 0;
    reporter.on_rename_start(total);

    let sources: HashSet<&Path> = plan.iter().map(|step| step.from.as_path()).collect();
    let mut staged: Vec<(&RenamePlan, PathBuf)> = Vec::new();

    for step in plan {
        if step.from == step.to {
            summary.unchanged += 1;
            done += 1;
            reporter.on_rename_progress(done, total);
            continue;
        }
        let staging = staging_path(&step.from);
        if (step.to.exists() && !sources.contains(step.to.as_path())) || staging.exists() {
            log_collision(step);
            summary.skipped.push(step.from.clone());
            done += 1;
            reporter.on_rename_progress(done, total);
            continue;
        }
        match fs::rename(&step.from, &staging) {
            Ok(()) => staged.push((step, staging)),
            Err(err) => {
                error!("Error renaming {}: {}", step.from.display(), err);
                summary.skipped.push(step.from.clone());
                done += 1;
                reporter.on_rename_progress(done, total);
            }
        }
    }

    for (step, staging) in staged {
        done += 1;
        reporter.on_rename_progress(done, total);

        // A source whose own rename was skipped still holds this target.
        if step.to.exists() {
            log_collision(step);
            restore(&staging, &step.from);
            summary.skipped.push(step.from.clone());
            continue;
        }
        match fs::rename(&staging, &step.to) {
            Ok(()) => {
                debug!("Renamed {} → {}", step.from.display(), step.to.display());
                summary.renamed += 1;
            }
            Err(err) => {
                error!("Error renaming {}: {}", step.from.display(), err);
                restore(&staging, &step.from);
                summary.skipped.push(step.from.clone());
            }
        }
    }

    finish(summary, start, reporter)
}

fn staging_path(from: &Path) -> PathBuf {
    let name = from
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    from.with_file_name(format!(".{}.renumbering", name))
}

fn restore(staging: &Path, original: &Path) {
    if let Err(err) = fs::rename(staging, original) {
        error!(
            "Could not move {} back to {}: {}",
            staging.display(),
            original.display(),
            err
        );
    }
}

fn log_collision(step: &RenamePlan) {
    error!(
        "Not renaming {} → {}: target already exists",
        step.from.display(),
        step.to.display()
    );
}

fn finish(
    summary: RenameSummary,
    start: Instant,
    reporter: &dyn ProgressReporter,
) -> RenameSummary {
    info!(
        "{} renamed, {} unchanged, {} skipped",
        summary.renamed,
        summary.unchanged,
        summary.skipped.len()
    );
    reporter.on_rename_complete(summary.renamed, start.elapsed().as_secs_f64());
    summary
}
