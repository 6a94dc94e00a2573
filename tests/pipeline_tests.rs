use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use xz2::write::XzEncoder;

use post_reconcile::dupes::{self, KeepPolicy};
use post_reconcile::index::PostIndex;
use post_reconcile::{comments, extract, reconcile, renumber, repeat_point, report, restructure};
use post_reconcile::{Error, MetadataScanner, Shortcode, SilentReporter};

/// Write a post folder holding one image and an xz metadata file.
fn write_post(root: &Path, dir: &str, shortcode: &str, comments: u64) -> PathBuf {
    let post = root.join(dir);
    fs::create_dir_all(&post).unwrap();
    fs::write(post.join("2024-01-01_12-00-00_UTC.jpg"), b"jpeg").unwrap();

    let json = format!(
        r#"{{"node":{{"shortcode":"{}","edge_media_to_parent_comment":{{"count":{}}}}}}}"#,
        shortcode, comments
    );
    let file = File::create(post.join("2024-01-01_12-00-00_UTC.json.xz")).unwrap();
    let mut enc = XzEncoder::new(file, 6);
    enc.write_all(json.as_bytes()).unwrap();
    enc.finish().unwrap();
    post
}

fn scanner(root: &Path) -> MetadataScanner {
    MetadataScanner::new(root, &[]).unwrap()
}

fn dir_names(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .flatten()
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_scanner_yields_records_and_skips_corrupt_metadata() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_post(root, "Post-1", "AAA", 2);
    let broken = root.join("Post-2");
    fs::create_dir_all(&broken).unwrap();
    fs::write(broken.join("x.json.xz"), b"garbage").unwrap();

    let records: Vec<_> = scanner(root).records().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].shortcode.as_str(), "AAA");
    assert_eq!(records[0].directory, root.join("Post-1"));
    assert_eq!(records[0].permalink(), "https://www.instagram.com/p/AAA/");
    assert_eq!(records[0].comment_count, Some(2));
}

#[test]
fn test_scanner_rejects_missing_root() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("nope");
    assert!(matches!(
        MetadataScanner::new(&missing, &[]),
        Err(Error::MissingRoot(_))
    ));
}

#[test]
fn test_scanner_honours_ignore_patterns() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_post(root, "Post-1", "AAA", 0);
    write_post(root, "skip/Post-2", "BBB", 0);

    let scanner = MetadataScanner::new(root, &["**/skip".to_string()]).unwrap();
    let codes: Vec<String> = scanner.records().map(|r| r.shortcode.to_string()).collect();
    assert_eq!(codes, vec!["AAA"]);
}

#[test]
fn test_find_failed_writes_retry_list_and_truncates() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("downloads");
    write_post(&root, "Post-1", "AAA", 0);
    let retry = tmp.path().join("failed_urls.txt");
    fs::write(&retry, "https://x/p/STALE/\nhttps://x/p/OLD/\n").unwrap();

    let requested = vec!["https://x/p/AAA/".to_string(), "https://x/p/BBB/".to_string()];
    let failed =
        reconcile::find_failed(&requested, &scanner(&root), &retry, &SilentReporter).unwrap();

    assert_eq!(failed.into_iter().collect::<Vec<_>>(), vec!["https://x/p/BBB/"]);
    assert_eq!(fs::read_to_string(&retry).unwrap(), "https://x/p/BBB/\n");

    // A second run over the same tree gives the same file.
    reconcile::find_failed(&requested, &scanner(&root), &retry, &SilentReporter).unwrap();
    assert_eq!(fs::read_to_string(&retry).unwrap(), "https://x/p/BBB/\n");
}

#[test]
fn test_extract_preserves_file_order_and_skips_bad_files() {
    let tmp = tempdir().unwrap();
    let first = tmp.path().join("b_first.csv");
    let second = tmp.path().join("a_second.csv");
    let no_column = tmp.path().join("no_column.csv");
    fs::write(&first, "Permalink\nhttps://x/p/1/\nhttps://x/p/2/\n").unwrap();
    fs::write(&second, "Other,Permalink\nq,https://x/p/3/\nq,https://x/p/1/\n").unwrap();
    fs::write(&no_column, "Link\nhttps://x/p/9/\n").unwrap();
    let missing = tmp.path().join("missing.xlsx");

    let urls = extract::extract_urls(&[first, missing, no_column, second], "Permalink");
    assert_eq!(
        urls,
        vec![
            "https://x/p/1/",
            "https://x/p/2/",
            "https://x/p/3/",
            "https://x/p/1/"
        ]
    );
}

#[test]
fn test_find_duplicates_only_surfaces_shared_shortcodes() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let x = write_post(root, "Post-1", "CCC", 0);
    let y = write_post(root, "Post-2", "CCC", 0);
    write_post(root, "Post-3", "DDD", 0);

    let groups = dupes::find_duplicates(&scanner(root));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[&Shortcode::new("CCC").unwrap()], vec![x, y]);
}

#[test]
fn test_remove_duplicates_keeps_first_path() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let x = write_post(root, "Post-1", "CCC", 0);
    let y = write_post(root, "Post-2", "CCC", 0);
    let z = write_post(root, "Post-3", "CCC", 0);
    let other = write_post(root, "Post-4", "DDD", 0);

    let groups = dupes::find_duplicates(&scanner(root));
    let summary = dupes::remove_duplicates(&groups, KeepPolicy::FirstPath, false, &SilentReporter);

    assert_eq!(summary.removed, vec![y.clone(), z.clone()]);
    assert!(x.exists());
    assert!(!y.exists());
    assert!(!z.exists());
    assert!(other.exists());
    assert!(dupes::find_duplicates(&scanner(root)).is_empty());
}

#[test]
fn test_remove_duplicates_most_files_and_dry_run() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let x = write_post(root, "Post-1", "CCC", 0);
    let y = write_post(root, "Post-2", "CCC", 0);
    fs::write(y.join("extra_1.jpg"), b"jpeg").unwrap();

    let groups = dupes::find_duplicates(&scanner(root));

    let dry = dupes::remove_duplicates(&groups, KeepPolicy::MostFiles, true, &SilentReporter);
    assert_eq!(dry.removed, vec![x.clone()]);
    assert!(x.exists());

    let real = dupes::remove_duplicates(&groups, KeepPolicy::MostFiles, false, &SilentReporter);
    assert_eq!(real.kept, vec![y.clone()]);
    assert!(!x.exists());
    assert!(y.exists());
}

#[test]
fn test_duplicates_report_appends() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("downloads");
    write_post(&root, "Post-1", "CCC", 0);
    write_post(&root, "Post-2", "CCC", 0);
    let report_path = tmp.path().join("duplicates.txt");

    let groups = dupes::find_duplicates(&scanner(&root));
    dupes::write_duplicates_report(&report_path, &groups).unwrap();
    dupes::write_duplicates_report(&report_path, &groups).unwrap();

    let text = fs::read_to_string(&report_path).unwrap();
    assert_eq!(
        text.matches("https://www.instagram.com/p/CCC/ -> [").count(),
        2
    );
}

#[test]
fn test_renumber_scenario_preserves_order() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for n in [7, 9, 12] {
        fs::create_dir_all(root.join(format!("Post-{}", n))).unwrap();
        fs::write(root.join(format!("Post-{}", n)).join("marker.txt"), n.to_string()).unwrap();
    }
    fs::create_dir_all(root.join("Post-20")).unwrap();

    let summary = renumber::renumber(root, 7, 12, &SilentReporter).unwrap();
    assert_eq!(summary.renamed, 3);
    assert!(summary.skipped.is_empty());
    assert_eq!(dir_names(root), vec!["Post-1", "Post-2", "Post-20", "Post-3"]);
    assert_eq!(fs::read_to_string(root.join("Post-1/marker.txt")).unwrap(), "7");
    assert_eq!(fs::read_to_string(root.join("Post-2/marker.txt")).unwrap(), "9");
    assert_eq!(fs::read_to_string(root.join("Post-3/marker.txt")).unwrap(), "12");
}

#[test]
fn test_renumber_skips_existing_targets() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for n in [1, 5, 6] {
        fs::create_dir_all(root.join(format!("Post-{}", n))).unwrap();
    }
    fs::write(root.join("Post-1").join("keep.txt"), "original").unwrap();

    // Post-5 → Post-1 collides with the untouched Post-1.
    let summary = renumber::renumber(root, 5, 6, &SilentReporter).unwrap();
    assert_eq!(summary.renamed, 1);
    assert_eq!(summary.skipped, vec![root.join("Post-5")]);
    assert_eq!(fs::read_to_string(root.join("Post-1/keep.txt")).unwrap(), "original");
    assert_eq!(dir_names(root), vec!["Post-1", "Post-2", "Post-5"]);
}

#[test]
fn test_renumber_from_zero_shifts_every_folder_up() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for n in 0..3 {
        let dir = root.join(format!("Post(F_6)-{}", n));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("marker.txt"), n.to_string()).unwrap();
    }

    let summary = renumber::renumber(root, 0, 2, &SilentReporter).unwrap();
    assert_eq!(summary.renamed, 3);
    assert!(summary.skipped.is_empty());
    assert_eq!(dir_names(root), vec!["Post(F_6)-1", "Post(F_6)-2", "Post(F_6)-3"]);
    assert_eq!(fs::read_to_string(root.join("Post(F_6)-1/marker.txt")).unwrap(), "0");
    assert_eq!(fs::read_to_string(root.join("Post(F_6)-3/marker.txt")).unwrap(), "2");
}

#[test]
fn test_renumber_restores_folder_blocked_by_skipped_source() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for n in [1, 2, 3] {
        let dir = root.join(format!("Post-{}", n));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("marker.txt"), n.to_string()).unwrap();
    }

    // Post-2 → Post-1 hits a folder outside the range, so Post-2 stays and
    // Post-3 → Post-2 has to go back where it was.
    let summary = renumber::renumber(root, 2, 3, &SilentReporter).unwrap();
    assert_eq!(summary.renamed, 0);
    assert_eq!(summary.skipped, vec![root.join("Post-2"), root.join("Post-3")]);
    assert_eq!(dir_names(root), vec!["Post-1", "Post-2", "Post-3"]);
    assert_eq!(fs::read_to_string(root.join("Post-3/marker.txt")).unwrap(), "3");
}

#[test]
fn test_renumber_as_normalises_prefix() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for name in ["Post(F_6)-4", "Post(F_7)-9", "Other-30"] {
        fs::create_dir_all(root.join(name)).unwrap();
    }

    let summary = renumber::renumber_as(root, 0, 10, Some("Post"), &SilentReporter).unwrap();
    assert_eq!(summary.renamed, 2);
    assert_eq!(dir_names(root), vec!["Other-30", "Post-1", "Post-2"]);
}

#[test]
fn test_rename_to_shortcodes_and_index() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_post(root, "Post-1", "AAA", 0);
    write_post(root, "Post-2", "BBB", 0);
    fs::create_dir_all(root.join("BBB")).unwrap();

    let summary = renumber::rename_to_shortcodes(&scanner(root), &SilentReporter);
    assert_eq!(summary.renamed, 1);
    assert_eq!(summary.skipped, vec![root.join("Post-2")]);
    assert!(root.join("AAA").is_dir());

    let index_path = root.join("post_index.csv");
    let index = post_reconcile::index::refresh(&scanner(root), &index_path).unwrap();
    assert_eq!(index.len(), 2);
    let loaded = PostIndex::load(&index_path).unwrap();
    assert_eq!(loaded, index);
    let bbb = loaded.lookup(&Shortcode::new("BBB").unwrap()).unwrap();
    assert_eq!(bbb.number, Some(2));
    assert_eq!(bbb.directory, "Post-2");
    assert_eq!(loaded.lookup(&Shortcode::new("AAA").unwrap()).unwrap().number, None);
}

#[test]
fn test_empty_and_metadata_less_folders() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_post(root, "Post-1", "AAA", 0);
    fs::create_dir_all(root.join("Post-10")).unwrap();
    fs::create_dir_all(root.join("Post-9")).unwrap();
    let no_meta = root.join("Post-3");
    fs::create_dir_all(&no_meta).unwrap();
    fs::write(no_meta.join("image.jpg"), b"jpeg").unwrap();
    fs::write(no_meta.join("bad.json.xz"), b"garbage").unwrap();

    let empty = report::find_empty_folders(&scanner(root));
    assert_eq!(empty, vec![root.join("Post-9"), root.join("Post-10")]);

    let missing = report::find_folders_without_metadata(&scanner(root));
    assert_eq!(missing, vec![no_meta]);

    let out = tmp.path().join("empty_folders.txt");
    report::append_paths(&out, "empty folders", &empty).unwrap();
    report::append_paths(&out, "empty folders", &empty).unwrap();
    let text = fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().filter(|l| l.ends_with("Post-9")).count(), 2);
}

#[test]
fn test_comment_counts_csv() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("downloads");
    write_post(&root, "Post-1", "AAA", 3);
    write_post(&root, "Post-2", "AAA", 4);

    let requested = vec!["https://x/p/BBB/".to_string(), "https://x/p/AAA/".to_string()];
    let counts = comments::count_comments(&requested, scanner(&root).records());
    let out = tmp.path().join("comment_counts.csv");
    comments::write_comment_counts(&out, &requested, &counts).unwrap();

    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "permalink,comment_count\nhttps://x/p/BBB/,-1\nhttps://x/p/AAA/,7\n"
    );
}

#[test]
fn test_repeat_point_suggests_last_match() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let caption = "First post caption #hashtag";
    for (n, text) in [(0, caption), (1, "other"), (40, caption), (42, "other"), (90, caption)] {
        let dir = root.join(format!("Post-{}", n));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("2024-01-01_UTC.txt"), text).unwrap();
    }

    let point = repeat_point::find_repeat_point(&scanner(root), caption);
    assert_eq!(point.matches, vec![0, 40, 90]);
    assert_eq!(point.largest_gap, Some((40, 90)));
    assert_eq!(point.suggested_start, Some(90));
}

#[test]
fn test_restructure_moves_complete_groups_only() {
    let tmp = tempdir().unwrap();
    let flat = tmp.path().join("flat");
    let posts = tmp.path().join("posts");
    fs::create_dir_all(&flat).unwrap();
    for name in [
        "u_2024-01-01_10-00-00_UTC.jpg",
        "u_2024-01-01_10-00-00_UTC.txt",
        "u_2024-01-01_10-00-00_UTC.json.xz",
        "u_2024-01-02_10-00-00_UTC.jpg",
        "u_2024-01-03_10-00-00_UTC.jpg",
        "u_2024-01-03_10-00-00_UTC.txt",
    ] {
        fs::write(flat.join(name), name).unwrap();
    }
    let existing = posts.join("u_2024-01-03_10-00-00_UTC_1");
    fs::create_dir_all(&existing).unwrap();
    fs::write(existing.join("u_2024-01-03_10-00-00_UTC.txt"), "old").unwrap();

    let summary = restructure::restructure(&flat, &posts).unwrap();
    assert_eq!(
        summary.folders,
        vec![posts.join("u_2024-01-01_10-00-00_UTC_0"), existing.clone()]
    );
    assert_eq!(summary.moved, 4);
    assert_eq!(summary.skipped, vec![flat.join("u_2024-01-03_10-00-00_UTC.txt")]);
    assert_eq!(summary.incomplete, 1);

    assert!(posts.join("u_2024-01-01_10-00-00_UTC_0/u_2024-01-01_10-00-00_UTC.json.xz").exists());
    assert_eq!(
        fs::read_to_string(existing.join("u_2024-01-03_10-00-00_UTC.txt")).unwrap(),
        "old"
    );
    assert!(flat.join("u_2024-01-02_10-00-00_UTC.jpg").exists());
}

#[test]
fn test_restructure_in_place_is_idempotent() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    for name in ["u_2024-01-01_10-00-00_UTC.jpg", "u_2024-01-01_10-00-00_UTC.txt"] {
        fs::write(root.join(name), name).unwrap();
    }

    let first = restructure::restructure(root, root).unwrap();
    assert_eq!(first.moved, 2);
    let second = restructure::restructure(root, root).unwrap();
    assert_eq!(second, restructure::RestructureSummary::default());
    assert_eq!(dir_names(root), vec!["u_2024-01-01_10-00-00_UTC_0"]);
}

#[test]
fn test_image_types_lists_lowercase_extensions() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    write_post(root, "Post-1", "AAA", 0);
    fs::write(root.join("Post-1/extra.PNG"), b"png").unwrap();
    fs::write(root.join("Post-1/caption.txt"), b"hi").unwrap();

    let types: Vec<String> = report::image_types(&scanner(root)).into_iter().collect();
    assert_eq!(types, vec!["jpg", "png"]);
}
