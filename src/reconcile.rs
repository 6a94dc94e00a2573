use crate::error::Result;
use crate::permalink::{self, Shortcode};
use crate::progress::ProgressReporter;
use crate::scanner::MetadataScanner;
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Requested URLs whose shortcode is not among the downloaded ones.
///
/// Both sides are compared by shortcode, so trailing slashes and query
/// strings don't matter. Requested URLs that don't parse are logged and left
/// out, so every returned URL is a valid permalink.
pub fn reconcile<R, D>(requested: R, downloaded: D) -> BTreeSet<String>
where
    R: IntoIterator,
    R::Item: AsRef<str>,
    D: IntoIterator,
    D::Item: AsRef<str>,
{
    let downloaded: HashSet<Shortcode> = downloaded
        .into_iter()
        .filter_map(|url| match permalink::parse(url.as_ref()) {
            Ok(code) => Some(code),
            Err(err) => {
                warn!("Ignoring downloaded entry: {}", err);
                None
            }
        })
        .collect();

    missing_from(requested, &downloaded)
}

/// Same as [`reconcile`] against an already collected shortcode set. A post
/// requested under several URL forms is listed once, in its first form.
pub fn missing_from<R>(requested: R, downloaded: &HashSet<Shortcode>) -> BTreeSet<String>
where
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    let mut listed: HashSet<Shortcode> = HashSet::new();
    requested
        .into_iter()
        .filter_map(|url| {
            let url = url.as_ref();
            match permalink::parse(url) {
                Ok(code) if downloaded.contains(&code) => None,
                Ok(code) => listed.insert(code).then(|| url.trim().to_string()),
                Err(err) => {
                    warn!("Skipping requested entry: {}", err);
                    None
                }
            }
        })
        .collect()
}

/// Overwrite `path` with one URL per line.
pub fn write_retry_list<'a, I>(path: &Path, urls: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut count = 0;
    for url in urls {
        writeln!(writer, "{}", url)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Scan `scanner`'s tree, reconcile `requested` against it and persist the
/// result to `retry_path`.
pub fn find_failed(
    requested: &[String],
    scanner: &MetadataScanner,
    retry_path: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<BTreeSet<String>> {
    let unique: HashSet<&str> = requested.iter().map(|s| s.trim()).collect();
    info!("Number of unique urls: {}", unique.len());

    let downloaded: HashSet<Shortcode> = scanner
        .collect_records(reporter)
        .into_iter()
        .map(|r| r.shortcode)
        .collect();
    info!("Number of downloaded posts: {}", downloaded.len());

    let failed = missing_from(requested, &downloaded);
    info!("Number of failed urls: {}", failed.len());

    write_retry_list(retry_path, &failed)?;
    Ok(failed)
}
