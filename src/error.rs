//! Custom error types for tidy-tweet.
//!
//! Every failure the core can raise is a variant of [`TidyTweetError`]. The
//! one soft condition, a store written by a different tidy-tweet release, is
//! not an error at all: it is reported as a [`LibraryVersionMismatch`] value.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for tidy-tweet operations.
#[derive(Error, Debug)]
pub enum TidyTweetError {
    // =========================================================================
    // Store Lifecycle Errors
    // =========================================================================
    /// The store records a schema version other than the running one.
    #[error(
        "Database file '{path}' is using tidy-tweet database schema version {}, but the version of tidy-tweet you are running uses schema version {expected}. These versions are not compatible. It is recommended to reprocess all your json files into a fresh database.",
        .found.as_deref().unwrap_or("<none>")
    )]
    SchemaVersionMismatch {
        path: PathBuf,
        expected: String,
        found: Option<String>,
    },

    /// The path exists but does not hold a tidy-tweet store.
    #[error("'{path}' is not a tidy-tweet database: {reason}")]
    NotAStore { path: PathBuf, reason: String },

    /// Refused to initialise over an existing path.
    #[error("Database '{path}' already exists; refusing to initialise over it")]
    DatabaseExists { path: PathBuf },

    /// Initialisation produced a different number of tables than registered.
    #[error("Expected {expected} tables after initialisation, found {found}")]
    TableCountMismatch { expected: usize, found: usize },

    /// The schema registry itself is inconsistent.
    #[error("Invalid schema definition for table '{table}': {reason}")]
    SchemaDefinition { table: &'static str, reason: String },

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    // =========================================================================
    // Ingestion Errors
    // =========================================================================
    /// Any failure while mapping or writing one page of a results file.
    #[error("Failed to process page {page} of '{file}': {source}")]
    PageProcessing {
        file: String,
        page: i64,
        #[source]
        source: Box<TidyTweetError>,
    },

    /// A line of the input is not valid JSON.
    #[error("Malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// A primary object lacks a key it cannot be stored without.
    #[error("{object} object is missing required field '{field}'")]
    MissingField {
        object: &'static str,
        field: &'static str,
    },

    /// A field holds a JSON value of an unexpected type.
    #[error("{object} field '{field}' should be {expected}")]
    InvalidField {
        object: &'static str,
        field: String,
        expected: &'static str,
    },

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// A configuration file named explicitly could not be used.
    #[error("Invalid configuration file '{path}': {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Catch-all for other errors with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for tidy-tweet operations.
pub type Result<T> = std::result::Result<T, TidyTweetError>;

impl TidyTweetError {
    /// Create a not-a-store error.
    pub fn not_a_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::NotAStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing field error.
    #[must_use]
    pub const fn missing_field(object: &'static str, field: &'static str) -> Self {
        Self::MissingField { object, field }
    }

    /// Create an invalid field error.
    pub fn invalid_field(
        object: &'static str,
        field: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidField {
            object,
            field: field.into(),
            expected,
        }
    }

    /// Tag an error with the file and 1-based page it happened in.
    pub fn in_page(self, file: impl Into<String>, page: i64) -> Self {
        Self::PageProcessing {
            file: file.into(),
            page,
            source: Box::new(self),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Wrap an error with additional context.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// The error behind a page-processing wrapper, or `self`.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::PageProcessing { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::SchemaVersionMismatch { .. } => {
                Some("Reprocess all your json files into a fresh database.")
            }
            Self::NotAStore { .. } => {
                Some("Choose a new database path; tidy-tweet creates it on first load.")
            }
            Self::DatabaseExists { .. } => Some(
                "Use 'tidy-tweet load' to add files to an existing database, or pass --allow-existing.",
            ),
            Self::PageProcessing { .. } => Some(
                "Pages before the failing one are already committed. Check that the file is unmodified twarc output.",
            ),
            Self::InvalidConfig { .. } => Some(
                "Fix the file, or unset --config/TIDY_TWEET_CONFIG to use ~/.config/tidy-tweet/config.toml.",
            ),
            _ => None,
        }
    }
}

/// Soft incompatibility: the store was written by another tidy-tweet release.
///
/// The schema matches, so ingestion may proceed, but parsing details may
/// differ between the rows already stored and the ones about to be added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryVersionMismatch {
    pub path: PathBuf,
    pub library_version: String,
    pub db_library_version: Option<String>,
}

impl LibraryVersionMismatch {
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Database file {} contains data processed with tidy-tweet version {}, but the version of tidy-tweet you are currently using is version {}. This is not necessarily incompatible, but if you notice any inconsistencies with how the data is parsed, you may wish to reprocess all your json files into a fresh and consistent database.",
            self.path.display(),
            self.db_library_version.as_deref().unwrap_or("<unknown>"),
            self.library_version,
        )
    }
}

impl std::fmt::Display for LibraryVersionMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context lazily (only evaluated on error).
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped with additional context.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| TidyTweetError::with_context(f(), e))
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
///
/// # Arguments
/// * `title` - Brief error title (e.g., "Schema version mismatch")
/// * `explanation` - What went wrong and why
/// * `suggestions` - List of actionable suggestions
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

/// Render a [`TidyTweetError`] for the terminal, with its suggestion if any.
#[must_use]
pub fn format_tidy_error(err: &TidyTweetError) -> String {
    let title = match err {
        TidyTweetError::SchemaVersionMismatch { .. } => "Schema version mismatch",
        TidyTweetError::NotAStore { .. } => "Not a tidy-tweet database",
        TidyTweetError::DatabaseExists { .. } => "Database already exists",
        TidyTweetError::PageProcessing { .. } => "Page processing failed",
        TidyTweetError::InvalidConfig { .. } => "Configuration error",
        _ => "tidy-tweet failed",
    };
    let suggestions: Vec<&str> = err.suggestion().into_iter().collect();
    format_error(title, &err.to_string(), &suggestions)
}
