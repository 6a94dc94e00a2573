pub mod comments;
pub mod config;
pub mod dupes;
pub mod error;
pub mod extract;
pub mod index;
pub mod permalink;
pub mod progress;
pub mod reconcile;
pub mod renumber;
pub mod repeat_point;
pub mod report;
pub mod restructure;
pub mod scanner;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use permalink::Shortcode;
pub use progress::{ProgressReporter, SilentReporter};
pub use scanner::{MetadataScanner, ScanRecord};
