//! Page ingestor: one twarc results file into a tidy-tweet store.
//!
//! Each line of a results file is one page of API results. Pages are
//! processed strictly in order, each inside its own transaction: the results
//! page row is written first, then every row mapped from the page's
//! `includes` and `data` sections. A failing page is rolled back and stops
//! the file; pages already committed stay committed.

use crate::error::{Result, TidyTweetError};
use crate::mapping::{map_media, map_page_metadata, map_tweet, map_user};
use crate::model::{Mappings, PageRef};
use crate::schema::SchemaRegistry;
use crate::storage::{Storage, check_compatibility};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Options for [`PageIngestor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Verify the store's schema version before reading any page.
    pub check_compatibility: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            check_compatibility: true,
        }
    }
}

/// Loads results files into a store created from the same registry.
#[derive(Debug, Clone, Copy)]
pub struct PageIngestor<'r> {
    registry: &'r SchemaRegistry,
    options: IngestOptions,
}

impl<'r> PageIngestor<'r> {
    #[must_use]
    pub const fn new(registry: &'r SchemaRegistry, options: IngestOptions) -> Self {
        Self { registry, options }
    }

    /// Ingest every page of `file` into the store at `db_path`.
    ///
    /// The store connection is held only for the duration of this call.
    /// Returns the number of pages processed.
    ///
    /// # Errors
    ///
    /// Returns a compatibility error before any page is read if the store does
    /// not match the registry, or [`TidyTweetError::PageProcessing`] for the
    /// first page that fails.
    pub fn ingest_file(&self, file: impl AsRef<Path>, db_path: impl AsRef<Path>) -> Result<usize> {
        let file = file.as_ref();
        let db_path = db_path.as_ref();

        if self.options.check_compatibility {
            check_compatibility(db_path, self.registry)?;
        }

        let reader = File::open(file).map_err(|e| TidyTweetError::path_error("open", file, e))?;
        let source_file = file.file_name().map_or_else(
            || file.to_string_lossy().into_owned(),
            |name| name.to_string_lossy().into_owned(),
        );

        let mut storage = Storage::open_existing(db_path)?;
        info!("Loading {} into {}", file.display(), db_path.display());
        let pages = self.ingest_reader(&source_file, BufReader::new(reader), &mut storage)?;
        info!("All {} pages of {} processed", pages, file.display());
        Ok(pages)
    }

    /// Ingest every page read from `reader`, recording `source_file` as
    /// their origin.
    ///
    /// Pages are numbered from 1 over non-blank lines.
    ///
    /// # Errors
    ///
    /// Returns [`TidyTweetError::PageProcessing`] for the first page that
    /// fails; later pages are not read.
    pub fn ingest_reader(
        &self,
        source_file: &str,
        reader: impl BufRead,
        storage: &mut Storage,
    ) -> Result<usize> {
        let mut page_number: i64 = 0;

        for line in reader.lines() {
            let line = line.map_err(|e| TidyTweetError::from(e).in_page(source_file, page_number + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            page_number += 1;

            let page = PageRef::new(source_file, page_number);
            self.ingest_page(&line, &page, storage)
                .map_err(|e| e.in_page(source_file, page_number))?;
        }

        Ok(usize::try_from(page_number).unwrap_or_default())
    }

    /// Ingest one page in its own transaction, returning the rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a JSON object, an object in it
    /// cannot be mapped, or an insert fails. Nothing from the page is kept.
    pub fn ingest_page(&self, line: &str, page: &PageRef, storage: &mut Storage) -> Result<usize> {
        let envelope: Value = serde_json::from_str(line)?;

        let page_row = map_page_metadata(&envelope, page)?;
        let mut tx = storage.begin_page(self.registry, &page_row)?;

        let mappings = map_page_objects(&envelope, page)?;
        tx.insert(&mappings)?;
        let rows = tx.commit()?;

        debug!("Processed {} ({} rows)", page, rows);
        Ok(rows)
    }
}

/// Map every object in a page: `includes` first, then `data`.
///
/// Only `data` objects are marked as directly collected. A `data` object
/// with a `username` is a user (user lookup endpoints); anything else is a
/// tweet.
///
/// # Errors
///
/// Returns an error if a section has the wrong shape or any object fails to
/// map.
pub fn map_page_objects(envelope: &Value, page: &PageRef) -> Result<Mappings> {
    let mut mappings = Mappings::new();

    match envelope.get("includes") {
        None | Some(Value::Null) => {}
        Some(Value::Object(includes)) => {
            for media in section(includes, "media")? {
                mappings.merge(map_media(media, page)?);
            }
            for user in section(includes, "users")? {
                mappings.merge(map_user(user, false, page)?);
            }
            for tweet in section(includes, "tweets")? {
                mappings.merge(map_tweet(tweet, false, page)?);
            }
        }
        Some(_) => return Err(TidyTweetError::invalid_field("page", "includes", "an object")),
    }

    for object in primary_objects(envelope)? {
        let mapped = if object.get("username").is_some() {
            map_user(object, true, page)?
        } else {
            map_tweet(object, true, page)?
        };
        mappings.merge(mapped);
    }

    Ok(mappings)
}

fn section<'v>(includes: &'v Map<String, Value>, key: &str) -> Result<&'v [Value]> {
    match includes.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(TidyTweetError::invalid_field(
            "page",
            format!("includes.{key}"),
            "an array",
        )),
    }
}

/// The primary results: a list, or a single object for lookup endpoints.
fn primary_objects(envelope: &Value) -> Result<&[Value]> {
    match envelope.get("data") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(object @ Value::Object(_)) => Ok(std::slice::from_ref(object)),
        Some(_) => Err(TidyTweetError::invalid_field(
            "page",
            "data",
            "an object or an array",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InitOptions;
    use serde_json::json;
    use std::io::Cursor;

    fn setup() -> (SchemaRegistry, Storage) {
        let registry = SchemaRegistry::new().unwrap();
        let storage = Storage::initialise_memory(&InitOptions::default(), &registry).unwrap();
        (registry, storage)
    }

    fn tweet(id: &str) -> Value {
        json!({"id": id, "author_id": "1", "text": format!("tweet {id}")})
    }

    fn page_line(data: &Value, retrieved_at: &str) -> String {
        json!({
            "data": data,
            "includes": {"users": [{"id": "1", "username": "author", "name": "Author"}]},
            "meta": {"result_count": 1},
            "__twarc": {"version": "2.10.4", "retrieved_at": retrieved_at}
        })
        .to_string()
    }

    fn count(storage: &Storage, sql: &str) -> i64 {
        storage.connection().query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_pages_numbered_over_non_blank_lines() {
        let (registry, mut storage) = setup();
        let input = format!(
            "{}\n\n   \n{}\n",
            page_line(&json!([tweet("10")]), "2022-03-10T00:00:00+00:00"),
            page_line(&json!([tweet("11")]), "2022-03-10T00:01:00+00:00"),
        );

        let ingestor = PageIngestor::new(&registry, IngestOptions::default());
        let pages = ingestor
            .ingest_reader("search.jsonl", Cursor::new(input), &mut storage)
            .unwrap();
        assert_eq!(pages, 2);

        let numbers: Vec<i64> = storage
            .connection()
            .prepare("SELECT page_number FROM results_page ORDER BY page_number")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(numbers, [1, 2]);
    }

    #[test]
    fn test_bare_object_data_is_one_result() {
        let (registry, mut storage) = setup();
        let ingestor = PageIngestor::new(&registry, IngestOptions::default());
        let line = page_line(&tweet("10"), "2022-03-10T00:00:00+00:00");

        ingestor
            .ingest_reader("lookup.jsonl", Cursor::new(line), &mut storage)
            .unwrap();
        assert_eq!(
            count(&storage, "SELECT COUNT(*) FROM tweet_by_page WHERE directly_collected = 1"),
            1
        );
    }

    #[test]
    fn test_user_data_maps_to_users() {
        let (registry, mut storage) = setup();
        let ingestor = PageIngestor::new(&registry, IngestOptions::default());
        let line = page_line(
            &json!([{"id": "5", "username": "follower", "name": "Follower"}]),
            "2022-03-10T00:00:00+00:00",
        );

        ingestor
            .ingest_reader("followers.jsonl", Cursor::new(line), &mut storage)
            .unwrap();
        assert_eq!(
            count(&storage, "SELECT COUNT(*) FROM user_by_page WHERE id = '5' AND directly_collected = 1"),
            1
        );
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM tweet_by_page"), 0);
    }

    #[test]
    fn test_failed_page_stops_file_and_keeps_earlier_pages() {
        let (registry, mut storage) = setup();
        let ingestor = PageIngestor::new(&registry, IngestOptions::default());
        let input = format!(
            "{}\n{}\n{}\n",
            page_line(&json!([tweet("10")]), "2022-03-10T00:00:00+00:00"),
            page_line(&json!([{"id": "11", "text": "no author"}]), "2022-03-10T00:01:00+00:00"),
            page_line(&json!([tweet("12")]), "2022-03-10T00:02:00+00:00"),
        );

        let err = ingestor
            .ingest_reader("search.jsonl", Cursor::new(input), &mut storage)
            .unwrap_err();
        match &err {
            TidyTweetError::PageProcessing { file, page, .. } => {
                assert_eq!(file, "search.jsonl");
                assert_eq!(*page, 2);
            }
            other => panic!("expected page processing error, got {other:?}"),
        }
        assert!(matches!(err.root_cause(), TidyTweetError::MissingField { .. }));

        assert_eq!(count(&storage, "SELECT COUNT(*) FROM results_page"), 1);
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM tweet_by_page"), 1);
    }

    #[test]
    fn test_malformed_json_is_a_page_error() {
        let (registry, mut storage) = setup();
        let ingestor = PageIngestor::new(&registry, IngestOptions::default());

        let err = ingestor
            .ingest_reader("broken.jsonl", Cursor::new("{\"data\": [\n"), &mut storage)
            .unwrap_err();
        assert!(matches!(err, TidyTweetError::PageProcessing { page: 1, .. }));
        assert!(matches!(err.root_cause(), TidyTweetError::MalformedJson(_)));
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM results_page"), 0);
    }

    #[test]
    fn test_include_and_data_on_same_page_keeps_first_write() {
        let (registry, mut storage) = setup();
        let ingestor = PageIngestor::new(&registry, IngestOptions::default());
        let line = json!({
            "data": [tweet("10")],
            "includes": {"tweets": [tweet("10")]},
            "__twarc": {"retrieved_at": "2022-03-10T00:00:00+00:00"}
        })
        .to_string();

        ingestor
            .ingest_reader("search.jsonl", Cursor::new(line), &mut storage)
            .unwrap();
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM tweet_by_page"), 1);
        assert_eq!(
            count(&storage, "SELECT directly_collected FROM tweet_by_page WHERE id = '10'"),
            0
        );
    }

    #[test]
    fn test_unchecked_ingest_into_missing_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("search.jsonl");
        std::fs::write(&file, page_line(&json!([tweet("10")]), "2022-03-10T00:00:00+00:00")).unwrap();
        let db = temp.path().join("missing.db");

        let registry = SchemaRegistry::new().unwrap();
        let ingestor = PageIngestor::new(
            &registry,
            IngestOptions {
                check_compatibility: false,
            },
        );
        let err = ingestor.ingest_file(&file, &db).unwrap_err();
        assert!(matches!(err, TidyTweetError::NotAStore { .. }));
        assert!(!db.exists());
    }

    #[test]
    fn test_map_page_objects_rejects_bad_sections() {
        let page = PageRef::new("x.jsonl", 1);
        assert!(map_page_objects(&json!({"data": "nope"}), &page).is_err());
        assert!(map_page_objects(&json!({"includes": []}), &page).is_err());
        assert!(map_page_objects(&json!({"includes": {"users": {}}}), &page).is_err());
        assert!(map_page_objects(&json!({}), &page).unwrap().is_empty());
        assert!(map_page_objects(&json!({"data": null}), &page).unwrap().is_empty());
    }

    #[test]
    fn test_includes_come_before_data() {
        let page = PageRef::new("x.jsonl", 1);
        let envelope = json!({
            "data": [tweet("20")],
            "includes": {
                "tweets": [tweet("21")],
                "media": [{"media_key": "3_1", "type": "photo"}]
            }
        });
        let mappings = map_page_objects(&envelope, &page).unwrap();
        let ids: Vec<_> = mappings
            .rows(crate::schema::Table::TweetByPage)
            .iter()
            .map(|row| match row {
                crate::model::Row::Tweet(t) => (t.id.as_str(), t.directly_collected),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, [("21", false), ("20", true)]);
        assert_eq!(mappings.rows(crate::schema::Table::Media).len(), 1);
    }
}
