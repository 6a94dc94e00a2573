use std::env;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/post-reconcile.log";

/// Pretty stdout plus a plain-text log file. `TRACING_LEVEL` wins over
/// `verbose`; the file comes from `LOG_FILE_PATH`. Keep the returned guard
/// alive for the whole run or buffered file lines are lost.
pub fn init_logger(verbose: bool) -> impl Drop {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| default_level.to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file = PathBuf::from(
        env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string()),
    );
    let log_dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let log_name = log_file
        .file_name()
        .map(|n| n.to_owned())
        .unwrap_or_else(|| "post-reconcile.log".into());

    let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .with_line_number(false)
                .without_time()
                .with_target(false)
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    info!("Logging to stdout and {}", log_file.display());
    debug!("Verbose logging enabled: {}", verbose);

    guard
}
