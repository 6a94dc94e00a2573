mod cli;
mod logging;
mod progress_bar;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use cli::{
    Cli, Commands, CommentsArgs, ConfirmArgs, RemoveArgs, RenumberArgs, RepeatPointArgs,
    RestructureArgs,
};
use colored::*;
use dotenv::dotenv;
use post_reconcile::{
    comments, dupes, extract, index, reconcile, renumber, repeat_point, report, restructure,
};
use post_reconcile::{AppConfig, MetadataScanner};
use progress_bar::CliReporter;
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();

    let _guard = logging::init_logger(args.verbose);

    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    let config = match post_reconcile::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let result = match command {
        Commands::Failed => run_failed(&config),
        Commands::Duplicates => run_duplicates(&config),
        Commands::RemoveDuplicates(args) => run_remove_duplicates(&config, &args),
        Commands::Renumber(args) => run_renumber(&config, &args),
        Commands::RenameToShortcode(args) => run_rename_to_shortcode(&config, &args),
        Commands::EmptyFolders => run_empty_folders(&config),
        Commands::MissingMetadata => run_missing_metadata(&config),
        Commands::Comments(args) => run_comments(&config, &args),
        Commands::RepeatPoint(args) => run_repeat_point(&config, &args),
        Commands::Index => run_index(&config),
        Commands::Restructure(args) => run_restructure(&config, &args),
        Commands::ImageTypes => run_image_types(&config),
        Commands::PrintConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    };

    if let Err(err) = &result {
        error!("Error: {:#}", err);
    }
    result
}

fn scanner_for(config: &AppConfig) -> anyhow::Result<MetadataScanner> {
    let root = config.download_root();
    MetadataScanner::new(&root, &config.ignore_patterns)
        .with_context(|| format!("cannot scan {}", root.display()))
}

fn requested_urls(config: &AppConfig) -> Vec<String> {
    let paths = config.spreadsheet_paths();
    if paths.is_empty() {
        warn!("No spreadsheets configured");
    }
    extract::extract_urls(&paths, &config.permalink_column)
}

fn run_failed(config: &AppConfig) -> anyhow::Result<()> {
    let scanner = scanner_for(config)?;
    let requested = requested_urls(config);
    let retry_path = PathBuf::from(&config.retry_file);

    let failed = reconcile::find_failed(&requested, &scanner, &retry_path, &CliReporter::new())?;
    for (i, url) in failed.iter().enumerate() {
        info!("Failed URL: {} at index: {}", url, i);
    }
    info!(
        "{} failed urls written to {}",
        format!("{}", failed.len()).red(),
        retry_path.display()
    );
    Ok(())
}

fn run_duplicates(config: &AppConfig) -> anyhow::Result<()> {
    let scanner = scanner_for(config)?;
    let groups = dupes::find_duplicates(&scanner);
    dupes::write_duplicates_report(PathBuf::from(&config.duplicates_file).as_path(), &groups)?;
    info!(
        "{} duplicate groups written to {}",
        format!("{}", groups.len()).red(),
        config.duplicates_file
    );
    Ok(())
}

fn run_remove_duplicates(config: &AppConfig, args: &RemoveArgs) -> anyhow::Result<()> {
    let scanner = scanner_for(config)?;
    let groups = dupes::find_duplicates(&scanner);
    if groups.is_empty() {
        info!("No duplicates found");
        return Ok(());
    }
    dupes::write_duplicates_report(PathBuf::from(&config.duplicates_file).as_path(), &groups)?;

    let doomed: usize = groups.values().map(|dirs| dirs.len() - 1).sum();
    if !args.dry_run
        && !confirmed(
            &args.confirm,
            &format!("Permanently delete {} duplicate folders?", doomed),
        )?
    {
        return Ok(());
    }

    let summary =
        dupes::remove_duplicates(&groups, args.keep.into(), args.dry_run, &CliReporter::new());
    info!(
        "{} groups: {} removed, {} missing, {} failed",
        summary.groups,
        format!("{}", summary.removed.len()).red(),
        summary.missing,
        summary.failed
    );
    if !args.dry_run {
        index::refresh(&scanner, &config.index_path())?;
    }
    Ok(())
}

fn run_renumber(config: &AppConfig, args: &RenumberArgs) -> anyhow::Result<()> {
    let root = config.download_root();
    let prefix = args.prefix.as_deref();
    let plan = renumber::plan_renumber_as(&root, args.start, args.end, prefix)?;
    if !confirmed(
        &args.confirm,
        &format!("Rename {} folders in {}?", plan.len(), root.display()),
    )? {
        return Ok(());
    }

    let summary =
        renumber::renumber_as(&root, args.start, args.end, prefix, &CliReporter::new())?;
    print_rename_summary(&summary);
    index::refresh(&scanner_for(config)?, &config.index_path())?;
    Ok(())
}

fn run_rename_to_shortcode(config: &AppConfig, args: &ConfirmArgs) -> anyhow::Result<()> {
    let scanner = scanner_for(config)?;
    if !confirmed(args, "Rename every post folder to its shortcode?")? {
        return Ok(());
    }
    let summary = renumber::rename_to_shortcodes(&scanner, &CliReporter::new());
    print_rename_summary(&summary);
    index::refresh(&scanner, &config.index_path())?;
    Ok(())
}

fn print_rename_summary(summary: &renumber::RenameSummary) {
    info!(
        "{} renamed, {} unchanged, {} skipped",
        format!("{}", summary.renamed).green(),
        summary.unchanged,
        format!("{}", summary.skipped.len()).red()
    );
}

fn run_empty_folders(config: &AppConfig) -> anyhow::Result<()> {
    let scanner = scanner_for(config)?;
    let empty = report::find_empty_folders(&scanner);
    report::append_paths(
        PathBuf::from(&config.empty_folders_file).as_path(),
        "empty folders",
        &empty,
    )?;
    info!("{} empty folders", format!("{}", empty.len()).red());
    Ok(())
}

fn run_missing_metadata(config: &AppConfig) -> anyhow::Result<()> {
    let scanner = scanner_for(config)?;
    for dir in report::find_folders_without_metadata(&scanner) {
        println!("{}", dir.display());
    }
    Ok(())
}

fn run_comments(config: &AppConfig, args: &CommentsArgs) -> anyhow::Result<()> {
    let scanner = scanner_for(config)?;
    let requested = requested_urls(config);
    let records = scanner.collect_records(&CliReporter::new());
    let counts = comments::count_comments(&requested, records);
    let rows = comments::write_comment_counts(
        PathBuf::from(&config.comments_file).as_path(),
        &requested,
        &counts,
    )?;
    info!("{} comment counts written to {}", rows, config.comments_file);

    if args.write_back {
        for path in config.spreadsheet_paths() {
            if let Err(err) =
                comments::annotate_spreadsheet(&path, &config.permalink_column, &counts)
            {
                error!("Error writing comment counts into {}: {}", path.display(), err);
            }
        }
    }
    Ok(())
}

fn run_repeat_point(config: &AppConfig, args: &RepeatPointArgs) -> anyhow::Result<()> {
    let needle = fs::read_to_string(&args.caption_file)
        .with_context(|| format!("cannot read {}", args.caption_file.display()))?;
    let scanner = scanner_for(config)?;
    let point = repeat_point::find_repeat_point(&scanner, needle.trim());

    match point.suggested_start {
        Some(start) => info!(
            "Caption repeats in {:?}; renumber from {}",
            point.matches,
            format!("{}", start).green()
        ),
        None => info!("Caption not found in any numbered folder"),
    }
    Ok(())
}

fn run_index(config: &AppConfig) -> anyhow::Result<()> {
    let scanner = scanner_for(config)?;
    let index = index::refresh(&scanner, &config.index_path())?;
    info!("{} posts indexed", index.len());
    Ok(())
}

fn run_restructure(config: &AppConfig, args: &RestructureArgs) -> anyhow::Result<()> {
    let destination = args
        .destination
        .clone()
        .unwrap_or_else(|| config.download_root());
    if !confirmed(
        &args.confirm,
        &format!(
            "Move posts from {} into {}?",
            args.source.display(),
            destination.display()
        ),
    )? {
        return Ok(());
    }

    let summary = restructure::restructure(&args.source, &destination)?;
    info!(
        "{} post folders, {} files moved, {} skipped, {} incomplete groups",
        format!("{}", summary.folders.len()).green(),
        summary.moved,
        format!("{}", summary.skipped.len()).red(),
        summary.incomplete
    );
    Ok(())
}

fn run_image_types(config: &AppConfig) -> anyhow::Result<()> {
    let scanner = scanner_for(config)?;
    for ext in report::image_types(&scanner) {
        println!(".{}", ext);
    }
    Ok(())
}

fn confirmed(args: &ConfirmArgs, prompt: &str) -> io::Result<bool> {
    if args.yes {
        return Ok(true);
    }
    prompt_confirm(prompt, Some(false))
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
