//! CLI argument definitions using clap derive

use crate::sync::Mastery;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tiercache - offline-first content cache
///
/// Serves generated lessons and listings from the local mirror, then the
/// remote store, and only then from the configured producer command.
#[derive(Parser, Debug)]
#[command(name = "tiercache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TIERCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a content key through the cache tiers
    Resolve(ResolveArgs),

    /// Show or update profile stats
    Stats(StatsArgs),

    /// Manage the vocabulary vault
    Vocab(VocabArgs),

    /// Record or list completed chapters
    Progress(ProgressArgs),

    /// Show activity history
    History(HistoryArgs),

    /// Purge cached content
    Clear(ClearArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Content key (lesson id, `news:<topic>`, ...)
    pub key: String,

    /// Treat the key as a listing that expires after the listing TTL
    #[arg(long)]
    pub listing: bool,

    /// Print the final content only, without streaming
    #[arg(short, long)]
    pub quiet: bool,

    /// Do not add the result to the activity history
    #[arg(long)]
    pub no_history: bool,
}

/// Arguments for the stats command
#[derive(Parser, Debug)]
pub struct StatsArgs {
    #[command(subcommand)]
    pub action: Option<StatsAction>,
}

/// Stats subcommands
#[derive(Subcommand, Debug)]
pub enum StatsAction {
    /// Show the current profile
    Show {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Award points or credits, or set streak and level
    Add {
        /// Points to add
        #[arg(long)]
        points: Option<u64>,

        /// Credits to add
        #[arg(long)]
        credits: Option<u64>,

        /// New streak value
        #[arg(long)]
        streak: Option<u32>,

        /// New level (A1..C2)
        #[arg(long)]
        level: Option<String>,
    },
}

/// Arguments for the vocab command
#[derive(Parser, Debug)]
pub struct VocabArgs {
    #[command(subcommand)]
    pub action: VocabAction,
}

/// Vocab subcommands
#[derive(Subcommand, Debug)]
pub enum VocabAction {
    /// Save a term, or count another practice of a saved one
    Add {
        /// Term being learned
        term: String,

        /// Translation
        translation: String,

        /// Word kind (noun, verb, ...)
        #[arg(short, long, default_value = "word")]
        kind: String,
    },

    /// Set a term's mastery
    Master {
        /// Saved term
        term: String,

        /// New mastery level
        level: MasteryLevel,
    },

    /// List the vault, most recently practiced first
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Arguments for the progress command
#[derive(Parser, Debug)]
pub struct ProgressArgs {
    #[command(subcommand)]
    pub action: ProgressAction,
}

/// Progress subcommands
#[derive(Subcommand, Debug)]
pub enum ProgressAction {
    /// Mark a chapter complete and award points
    Complete {
        /// Chapter id
        chapter: String,

        /// Points earned
        #[arg(long, default_value = "0")]
        points: u64,
    },

    /// List completed chapters
    List {
        /// Output format
        #[arg(short, long, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Arguments for the history command
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: HistoryAction,
}

/// History subcommands
#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List activity, newest first
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the current run of active days
    Streak,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Also clear the activity history
    #[arg(long)]
    pub history: bool,

    /// Confirm the purge
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Mastery level accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MasteryLevel {
    New,
    Learning,
    Mastered,
    Critical,
}

impl From<MasteryLevel> for Mastery {
    fn from(level: MasteryLevel) -> Self {
        match level {
            MasteryLevel::New => Mastery::New,
            MasteryLevel::Learning => Mastery::Learning,
            MasteryLevel::Mastered => Mastery::Mastered,
            MasteryLevel::Critical => Mastery::Critical,
        }
    }
}
