use clap::{Args, Parser, Subcommand, ValueEnum};
use post_reconcile::dupes::KeepPolicy;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "post-reconcile")]
#[command(about = "Reconcile, deduplicate and renumber downloaded posts", long_about = None)]
pub struct Cli {
    /// Log at debug level unless TRACING_LEVEL says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write spreadsheet URLs with no downloaded folder to the retry list
    Failed,
    /// Report shortcodes downloaded into more than one folder
    Duplicates,
    /// Delete all but one folder of every duplicate group
    RemoveDuplicates(RemoveArgs),
    /// Renumber folder suffixes in [start, end] onto 1..=N
    Renumber(RenumberArgs),
    /// Rename each post folder to its shortcode
    RenameToShortcode(ConfirmArgs),
    /// Report folders with no files
    EmptyFolders,
    /// Report folders with files but no readable metadata
    MissingMetadata,
    /// Write comment counts for every spreadsheet URL
    Comments(CommentsArgs),
    /// Find where a repeated download run started
    RepeatPoint(RepeatPointArgs),
    /// Rebuild the shortcode index file
    Index,
    /// Move flat downloads into one folder per post
    Restructure(RestructureArgs),
    /// List the image file types present in the download tree
    ImageTypes,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Keep {
    /// Keep the lexicographically first path
    First,
    /// Keep the folder with the most entries
    MostFiles,
}

impl From<Keep> for KeepPolicy {
    fn from(value: Keep) -> Self {
        match value {
            Keep::First => KeepPolicy::FirstPath,
            Keep::MostFiles => KeepPolicy::MostFiles,
        }
    }
}

#[derive(Debug, Args)]
pub struct ConfirmArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Which folder of each group survives
    #[arg(long, value_enum, default_value_t = Keep::First)]
    pub keep: Keep,
    /// Log what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,
    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

#[derive(Debug, Args)]
pub struct RenumberArgs {
    /// Lowest suffix taking part
    pub start: u64,
    /// Highest suffix taking part
    pub end: u64,
    /// Replace each folder's prefix, e.g. `--prefix Post` gives `Post-1`
    #[arg(long)]
    pub prefix: Option<String>,
    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

#[derive(Debug, Args)]
pub struct RestructureArgs {
    /// Directory holding the flat downloads
    pub source: PathBuf,
    /// Where post folders go, defaults to the download directory
    #[arg(long)]
    pub destination: Option<PathBuf>,
    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

#[derive(Debug, Args)]
pub struct CommentsArgs {
    /// Also add a "Comment Count" column to each spreadsheet
    #[arg(long)]
    pub write_back: bool,
}

#[derive(Debug, Args)]
pub struct RepeatPointArgs {
    /// File holding the caption of the first downloaded post
    pub caption_file: PathBuf,
}
