use indicatif::{ProgressBar, ProgressStyle};
use post_reconcile::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Scan phase: spinner (record count unknown upfront)
/// - Remove and rename phases: progress bar over the planned folders
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn start_bar(&self, verb: &str, total: usize) {
        let pb = ProgressBar::new(total as u64);
        let template = format!(
            "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} folders",
            verb
        );
        if let Ok(style) = ProgressStyle::with_template(&template) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICKS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICKS));
        }
        pb.set_message("Scanning metadata...");
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_scan_progress(&self, records_found: usize, _current_path: &str) {
        self.with_bar(|pb| pb.set_message(format!("Scanning... {} posts found", records_found)));
    }

    fn on_scan_complete(&self, total_records: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} posts in {:.2}s",
            total_records, duration_secs
        );
    }

    fn on_remove_start(&self, total_dirs: usize) {
        self.start_bar("Removing", total_dirs);
    }

    fn on_remove_progress(&self, done: usize, _total_dirs: usize) {
        self.with_bar(|pb| pb.set_position(done as u64));
    }

    fn on_remove_complete(&self, removed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Removal complete: {} folders in {:.2}s",
            removed, duration_secs
        );
    }

    fn on_rename_start(&self, total_dirs: usize) {
        self.start_bar("Renaming", total_dirs);
    }

    fn on_rename_progress(&self, done: usize, _total_dirs: usize) {
        self.with_bar(|pb| pb.set_position(done as u64));
    }

    fn on_rename_complete(&self, renamed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Rename complete: {} folders in {:.2}s",
            renamed, duration_secs
        );
    }
}
