//! CLI definitions for tidy-tweet.
//!
//! Uses clap for argument parsing with derive macros.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// tidy-tweet - Tidy twarc results into a relational database
#[derive(Parser, Debug)]
#[command(name = "tidy-tweet")]
#[command(version)]
#[command(about = "Load twarc Twitter/X API result files into a tidy SQLite database")]
#[command(long_about = r##"
tidy-tweet reads the newline-delimited JSON files written by twarc (one page
of Twitter/X API results per line) and normalises them into a relational
SQLite database: tweets, users, media, URLs, hashtags, mentions and the
results page every object was observed on.

Quick start:
  1. Collect data: twarc2 search "#rustlang" results.jsonl
  2. Load it:      tidy-tweet load tweets.db results.jsonl
  3. Query it:     sqlite3 tweets.db "select * from tweet limit 5"
"##)]
pub struct Cli {
    /// Path to a configuration file (default: ~/.config/tidy-tweet/config.toml)
    #[arg(long, env = "TIDY_TWEET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Be verbose (-v for debug, -vv for trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Be quiet (suppress non-error output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load twarc result files into a database, creating it if needed
    Load(LoadArgs),

    /// Create an empty database
    Init(InitArgs),

    /// Check an existing database against this version of tidy-tweet
    Check(CheckArgs),

    /// Print the database schema
    Schema(SchemaArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Database to load into
    pub db: PathBuf,

    /// twarc result files (JSON lines), processed in the order given
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Create a new database with strict column typing
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path of the database to create
    pub db: PathBuf,

    /// Create tables with strict column typing
    #[arg(long)]
    pub strict: bool,

    /// Add the tables to a database file that already exists
    #[arg(long)]
    pub allow_existing: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Database to check
    pub db: PathBuf,
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Show the strict variant of every create statement
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
