//! tidy-tweet - Tidy twarc Twitter/X API results into `SQLite`
//!
//! This library maps the paginated JSON written by twarc into a fixed,
//! versioned relational schema: one row per results page, per-page
//! observations of tweets and users, media, and the URLs, hashtags, mentions,
//! cashtags and annotations found in them.
//!
//! # Modules
//!
//! - [`schema`] - Table catalogue, insert statements and schema version
//! - [`mapping`] - Pure mapping of JSON objects to typed rows
//! - [`model`] - Typed rows and per-table row batches
//! - [`ingest`] - Page-by-page loading of results files
//! - [`storage`] - `SQLite` store creation and compatibility checks
//! - [`error`] - Error types with rich context
//!
//! # Example
//!
//! ```no_run
//! use tidy_tweet::{InitOptions, ingest_file, initialise};
//!
//! initialise("tweets.db", &InitOptions::default())?;
//! let pages = ingest_file("results.jsonl", "tweets.db")?;
//! println!("Loaded {pages} pages");
//! # Ok::<(), tidy_tweet::TidyTweetError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod schema;
pub mod storage;

pub use config::Config;
pub use error::{LibraryVersionMismatch, Result, ResultExt, TidyTweetError, format_error};
pub use ingest::{IngestOptions, PageIngestor};
pub use model::{Mappings, PageRef, Row};
pub use schema::{LIBRARY_VERSION, SCHEMA_VERSION, SchemaRegistry, Table};
pub use storage::{Compatibility, InitOptions, Storage};

use std::path::Path;

const BYTES_PER_KB: u64 = 1024;
const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Create a new, empty store at `db_path`.
///
/// # Errors
///
/// Returns an error if the path already exists (unless allowed) or the schema
/// cannot be created.
pub fn initialise(db_path: impl AsRef<Path>, options: &InitOptions) -> Result<()> {
    let registry = SchemaRegistry::new()?;
    Storage::initialise(db_path, options, &registry)?;
    Ok(())
}

/// Check that the store at `db_path` was created with the current schema.
///
/// # Errors
///
/// Returns [`TidyTweetError::SchemaVersionMismatch`] or
/// [`TidyTweetError::NotAStore`] if more data must not be added to it.
pub fn check_compatibility(db_path: impl AsRef<Path>) -> Result<Compatibility> {
    let registry = SchemaRegistry::new()?;
    storage::check_compatibility(db_path, &registry)
}

/// Load one twarc results file into the store at `db_path`, returning the
/// number of pages processed.
///
/// # Errors
///
/// Returns a compatibility error before reading any page, or
/// [`TidyTweetError::PageProcessing`] naming the first page that failed.
pub fn ingest_file(file: impl AsRef<Path>, db_path: impl AsRef<Path>) -> Result<usize> {
    let registry = SchemaRegistry::new()?;
    PageIngestor::new(&registry, IngestOptions::default()).ingest_file(file, db_path)
}

/// Format an integer with thousands separators.
#[must_use]
pub fn format_number(value: i64) -> String {
    let abs = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(abs.len() + abs.len() / 3);

    for (idx, ch) in abs.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut formatted: String = out.chars().rev().collect();
    if value < 0 {
        formatted.insert(0, '-');
    }
    formatted
}

/// Format a usize with thousands separators.
#[must_use]
pub fn format_number_usize(value: usize) -> String {
    format_number(i64::try_from(value).unwrap_or(i64::MAX))
}

/// Format bytes into a human-friendly string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < BYTES_PER_KB {
        format!("{bytes} B")
    } else if bytes < BYTES_PER_MB {
        format_bytes_with_unit(bytes, BYTES_PER_KB, "KB")
    } else if bytes < BYTES_PER_GB {
        format_bytes_with_unit(bytes, BYTES_PER_MB, "MB")
    } else {
        format_bytes_with_unit(bytes, BYTES_PER_GB, "GB")
    }
}

fn format_bytes_with_unit(bytes: u64, unit: u64, suffix: &str) -> String {
    let whole = bytes / unit;
    let tenths = (bytes % unit) * 10 / unit;
    format!("{whole}.{tenths} {suffix}")
}
