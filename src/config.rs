use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Root holding one subdirectory per downloaded post.
    pub download_dir: String,
    #[serde(default)]
    pub spreadsheets: Vec<String>,
    #[serde(default = "default_permalink_column")]
    pub permalink_column: String,
    #[serde(default = "default_retry_file")]
    pub retry_file: String,
    #[serde(default = "default_empty_folders_file")]
    pub empty_folders_file: String,
    #[serde(default = "default_duplicates_file")]
    pub duplicates_file: String,
    #[serde(default = "default_comments_file")]
    pub comments_file: String,
    /// Index file name, relative to `download_dir`.
    #[serde(default = "default_index_file")]
    pub index_file: String,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_permalink_column() -> String {
    "Permalink".to_string()
}

fn default_retry_file() -> String {
    "failed_urls.txt".to_string()
}

fn default_empty_folders_file() -> String {
    "empty_folders.txt".to_string()
}

fn default_duplicates_file() -> String {
    "duplicates.txt".to_string()
}

fn default_comments_file() -> String {
    "comment_counts.csv".to_string()
}

fn default_index_file() -> String {
    "post_index.csv".to_string()
}

impl AppConfig {
    /// A config with defaults for everything but the download root.
    pub fn with_download_dir(download_dir: impl Into<String>) -> Self {
        Self {
            download_dir: download_dir.into(),
            spreadsheets: Vec::new(),
            permalink_column: default_permalink_column(),
            retry_file: default_retry_file(),
            empty_folders_file: default_empty_folders_file(),
            duplicates_file: default_duplicates_file(),
            comments_file: default_comments_file(),
            index_file: default_index_file(),
            ignore_patterns: Vec::new(),
        }
    }

    pub fn download_root(&self) -> PathBuf {
        expand_home(&self.download_dir)
    }

    pub fn spreadsheet_paths(&self) -> Vec<PathBuf> {
        self.spreadsheets.iter().map(|s| expand_home(s)).collect()
    }

    pub fn index_path(&self) -> PathBuf {
        self.download_root().join(&self.index_file)
    }
}

/// Load `Config.toml` (optional) overlaid with `POST_RECONCILE_*` environment
/// variables. List values in the environment are comma separated.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("POST_RECONCILE")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("spreadsheets")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Expand a leading `~` against `HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home).join(path.trim_start_matches('~').trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}
