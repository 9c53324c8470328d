//! `SQLite` storage lifecycle for tidy-tweet databases.
//!
//! Creates fresh stores from the [`SchemaRegistry`], validates existing stores
//! against it, and writes page batches transactionally.

use crate::error::{LibraryVersionMismatch, Result, ResultExt, TidyTweetError};
use crate::mapping::map_library_metadata;
use crate::model::{Mappings, PageRow};
use crate::schema::{LIBRARY_VERSION, SchemaRegistry, Table};
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, Transaction};
use std::path::Path;
use tracing::{debug, info, warn};

/// Options for creating a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitOptions {
    /// Add the tidy-tweet tables to a database file that already exists.
    pub allow_existing: bool,
    /// Create every table with SQLite's `strict` column typing.
    pub strict: bool,
}

/// Outcome of a successful compatibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// Schema matches but the store was written by another release.
    LibraryVersionDiffers(LibraryVersionMismatch),
}

impl Compatibility {
    #[must_use]
    pub const fn warning(&self) -> Option<&LibraryVersionMismatch> {
        match self {
            Self::Compatible => None,
            Self::LibraryVersionDiffers(mismatch) => Some(mismatch),
        }
    }
}

/// Row count of one table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStat {
    pub name: &'static str,
    pub rows: i64,
}

/// `SQLite` storage manager
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).with_context(|| {
            format!("Failed to open database at {}", db_path.as_ref().display())
        })?;
        Self::configure(conn)
    }

    /// Open an existing database for writing, never creating the file.
    ///
    /// # Errors
    ///
    /// Returns [`TidyTweetError::NotAStore`] if the file does not exist or
    /// cannot be opened for writing.
    pub fn open_existing(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| TidyTweetError::not_a_store(db_path, e.to_string()))?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;
        Ok(Self { conn })
    }

    /// Open an empty in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be opened.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            ",
        )?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying database connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create a new store at `db_path` with every registered table and view.
    ///
    /// # Errors
    ///
    /// Returns [`TidyTweetError::DatabaseExists`] if the path exists and
    /// `allow_existing` is not set, or an error if any create statement fails.
    pub fn initialise(
        db_path: impl AsRef<Path>,
        options: &InitOptions,
        registry: &SchemaRegistry,
    ) -> Result<Self> {
        let db_path = db_path.as_ref();
        if db_path.exists() && !options.allow_existing {
            return Err(TidyTweetError::DatabaseExists {
                path: db_path.to_path_buf(),
            });
        }

        let mut storage = Self::open(db_path)?;
        storage.create_schema(options, registry)?;
        info!("The database schema has been initialised at {}", db_path.display());
        Ok(storage)
    }

    /// Create a new in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if any create statement fails.
    pub fn initialise_memory(options: &InitOptions, registry: &SchemaRegistry) -> Result<Self> {
        let mut storage = Self::open_memory()?;
        storage.create_schema(options, registry)?;
        Ok(storage)
    }

    /// Create tables, views and version metadata in one transaction.
    ///
    /// Metadata goes in last, so its presence certifies a complete schema.
    fn create_schema(&mut self, options: &InitOptions, registry: &SchemaRegistry) -> Result<()> {
        let tx = self.conn.transaction()?;

        for (definition, statement) in registry
            .table_definitions()
            .iter()
            .zip(registry.create_statements(options.strict))
        {
            tx.execute_batch(&statement)?;
            debug!("Created table {}", definition.name());
        }
        for view in registry.views() {
            tx.execute_batch(view.create)?;
            debug!("Created view {}", view.name);
        }

        insert_mappings(&tx, registry, &map_library_metadata(registry))?;

        if !options.allow_existing {
            let found: i64 = tx.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )?;
            let expected = registry.table_definitions().len();
            if usize::try_from(found).ok() != Some(expected) {
                return Err(TidyTweetError::TableCountMismatch {
                    expected,
                    found: usize::try_from(found).unwrap_or_default(),
                });
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Read one `_metadata` value.
    ///
    /// # Errors
    ///
    /// Returns an error if the `_metadata` table cannot be queried.
    pub fn read_metadata(&self, key: &str) -> Result<Option<String>> {
        read_metadata_value(&self.conn, key)
    }

    /// Start the transaction for one page, writing its results page row first.
    ///
    /// Dropping the returned transaction without committing rolls the whole
    /// page back.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot start or the page row
    /// cannot be inserted.
    pub fn begin_page<'s>(
        &'s mut self,
        registry: &'s SchemaRegistry,
        page: &PageRow,
    ) -> Result<PageTransaction<'s>> {
        let tx = self.conn.transaction()?;
        tx.prepare_cached(registry.definition(Table::ResultsPage).insert())?
            .execute(page.named_params().as_slice())?;
        debug!("Recorded results page {}", page.page);

        Ok(PageTransaction {
            tx,
            registry,
            rows: 1,
        })
    }

    /// Row counts for every registered table, then every view.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub fn table_row_counts(&self, registry: &SchemaRegistry) -> Result<Vec<TableStat>> {
        let names = registry
            .table_definitions()
            .iter()
            .map(|definition| definition.name())
            .chain(registry.views().iter().map(|view| view.name));

        let mut stats = Vec::new();
        for name in names {
            let rows = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM \"{name}\""), [], |row| row.get(0))?;
            stats.push(TableStat { name, rows });
        }
        Ok(stats)
    }
}

/// Writes for one page, committed or rolled back as a unit.
pub struct PageTransaction<'s> {
    tx: Transaction<'s>,
    registry: &'s SchemaRegistry,
    rows: usize,
}

impl PageTransaction<'_> {
    /// Insert every non-empty table batch, in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails.
    pub fn insert(&mut self, mappings: &Mappings) -> Result<usize> {
        let written = insert_mappings(&self.tx, self.registry, mappings)?;
        self.rows += written;
        Ok(written)
    }

    /// Commit the page, returning the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn commit(self) -> Result<usize> {
        self.tx.commit()?;
        Ok(self.rows)
    }
}

/// Execute the registered insert for every row, one prepared statement per
/// table. Tables without rows are skipped.
fn insert_mappings(conn: &Connection, registry: &SchemaRegistry, mappings: &Mappings) -> Result<usize> {
    let mut written = 0;
    for table in mappings.tables() {
        let rows = mappings.rows(table);
        let mut stmt = conn.prepare_cached(registry.definition(table).insert())?;
        for row in rows {
            stmt.execute(row.named_params().as_slice())?;
        }
        debug!("Wrote {} rows to {}", rows.len(), table);
        written += rows.len();
    }
    Ok(written)
}

fn read_metadata_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> = conn
        .query_row(
            "SELECT metadata_value FROM _metadata WHERE metadata_key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.flatten())
}

fn is_not_a_database(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::NotADatabase
    )
}

/// Check that an existing store can take more data from this registry.
///
/// The file is opened read-only and never modified.
///
/// # Errors
///
/// Returns [`TidyTweetError::NotAStore`] if the path is missing, is not a
/// `SQLite` database, or has no `_metadata` table, and
/// [`TidyTweetError::SchemaVersionMismatch`] if the recorded schema version is
/// absent or differs from the registry's.
pub fn check_compatibility(
    db_path: impl AsRef<Path>,
    registry: &SchemaRegistry,
) -> Result<Compatibility> {
    let db_path = db_path.as_ref();
    debug!("Checking version compatibility of {}", db_path.display());

    if !db_path.is_file() {
        return Err(TidyTweetError::not_a_store(db_path, "no such file"));
    }

    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| TidyTweetError::not_a_store(db_path, e.to_string()))?;

    let has_metadata = match conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_metadata'",
        [],
        |row| row.get::<_, i64>(0),
    ) {
        Ok(count) => count > 0,
        Err(e) if is_not_a_database(&e) => {
            return Err(TidyTweetError::not_a_store(db_path, "file is not a SQLite database"));
        }
        Err(e) => return Err(TidyTweetError::not_a_store(db_path, e.to_string())),
    };
    if !has_metadata {
        return Err(TidyTweetError::not_a_store(
            db_path,
            "database has no _metadata table",
        ));
    }

    let schema_version = read_metadata_value(&conn, "schema_version")?;
    if schema_version.as_deref() != Some(registry.schema_version()) {
        return Err(TidyTweetError::SchemaVersionMismatch {
            path: db_path.to_path_buf(),
            expected: registry.schema_version().to_string(),
            found: schema_version,
        });
    }

    let db_library_version = read_metadata_value(&conn, "tidy_tweet_version")?;
    if db_library_version.as_deref() != Some(LIBRARY_VERSION) {
        let mismatch = LibraryVersionMismatch {
            path: db_path.to_path_buf(),
            library_version: LIBRARY_VERSION.to_string(),
            db_library_version,
        };
        warn!("{}", mismatch.message());
        return Ok(Compatibility::LibraryVersionDiffers(mismatch));
    }

    info!("Database {} matches current tidy-tweet version", db_path.display());
    Ok(Compatibility::Compatible)
}
