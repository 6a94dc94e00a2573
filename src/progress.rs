/// Trait for reporting batch progress.
///
/// The CLI implements it with indicatif spinners; library callers and tests
/// use [`SilentReporter`]. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_progress(&self, _records_found: usize, _current_path: &str) {}
    fn on_scan_complete(&self, _total_records: usize, _duration_secs: f64) {}
    fn on_remove_start(&self, _total_dirs: usize) {}
    fn on_remove_progress(&self, _done: usize, _total_dirs: usize) {}
    fn on_remove_complete(&self, _removed: usize, _duration_secs: f64) {}
    fn on_rename_start(&self, _total_dirs: usize) {}
    fn on_rename_progress(&self, _done: usize, _total_dirs: usize) {}
    fn on_rename_complete(&self, _renamed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
