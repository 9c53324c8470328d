//! Row models for the tidy-tweet tables.
//!
//! Each struct is one row of one registered table. Rows know how to present
//! themselves as named SQL parameters matching the registry's insert column
//! list, so the ingestor never builds SQL by hand.

use crate::schema::Table;
use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;
use std::collections::BTreeMap;

/// Named parameters for a registered insert statement.
pub type NamedParams<'a> = Vec<(&'static str, &'a dyn ToSql)>;

/// The page an object was observed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRef {
    pub source_file: String,
    /// 1-based line number of the page within its file.
    pub page_number: i64,
}

impl PageRef {
    #[must_use]
    pub fn new(source_file: impl Into<String>, page_number: i64) -> Self {
        Self {
            source_file: source_file.into(),
            page_number,
        }
    }
}

impl std::fmt::Display for PageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} page {}", self.source_file, self.page_number)
    }
}

/// Kind of object an entity (URL, hashtag, ...) was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    Tweet,
    User,
}

impl OwnerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tweet => "tweet",
            Self::User => "user",
        }
    }
}

impl ToSql for OwnerKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

/// Where an entity was found: the owning object and the field holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySource {
    pub source_id: String,
    pub source_type: OwnerKind,
    /// Field of the owner the entity appeared in, e.g. `text` or `description`.
    pub field: String,
}

impl EntitySource {
    #[must_use]
    pub fn new(source_id: impl Into<String>, source_type: OwnerKind, field: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            source_type,
            field: field.into(),
        }
    }
}

/// A `_metadata` key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    pub key: String,
    pub value: String,
}

/// One results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRow {
    pub page: PageRef,
    pub oldest_id: Option<String>,
    pub newest_id: Option<String>,
    pub result_count: Option<i64>,
    pub retrieved_at: Option<String>,
    pub request_url: Option<String>,
    pub twarc_version: Option<String>,
    pub additional_metadata: Option<String>,
}

/// A user as observed on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub profile_image_url: Option<String>,
    pub created_at: Option<String>,
    pub protected: Option<bool>,
    pub verified: Option<bool>,
    pub pinned_tweet_id: Option<String>,
    pub followers_count: Option<i64>,
    pub following_count: Option<i64>,
    pub tweet_count: Option<i64>,
    pub listed_count: Option<i64>,
    pub directly_collected: bool,
    pub page: PageRef,
}

/// A tweet as observed on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetRow {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub lang: Option<String>,
    pub source: Option<String>,
    pub possibly_sensitive: Option<bool>,
    pub reply_settings: Option<String>,
    pub created_at: Option<String>,
    pub conversation_id: Option<String>,
    pub in_reply_to_user_id: Option<String>,
    pub retweeted_tweet_id: Option<String>,
    pub quoted_tweet_id: Option<String>,
    pub replied_to_tweet_id: Option<String>,
    pub like_count: Option<i64>,
    pub quote_count: Option<i64>,
    pub reply_count: Option<i64>,
    pub retweet_count: Option<i64>,
    pub bookmark_count: Option<i64>,
    pub impression_count: Option<i64>,
    pub directly_collected: bool,
    pub page: PageRef,
}

/// A media attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRow {
    pub media_key: String,
    pub media_type: String,
    pub url: Option<String>,
    pub preview_image_url: Option<String>,
    pub height: Option<i64>,
    pub width: Option<i64>,
    pub duration_ms: Option<i64>,
    pub alt_text: Option<String>,
    pub view_count: Option<i64>,
    pub page: PageRef,
}

/// Link between a tweet and one of its media attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetMediaRow {
    pub tweet_id: String,
    pub media_key: String,
    pub page: PageRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRow {
    pub source: EntitySource,
    pub url: String,
    pub expanded_url: Option<String>,
    pub display_url: Option<String>,
    pub unwound_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub page: PageRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashtagRow {
    pub source: EntitySource,
    pub tag: String,
    /// Case-folded tag for case-insensitive grouping.
    pub tag_lower: String,
    pub page: PageRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionRow {
    pub source: EntitySource,
    pub username: String,
    pub user_id: Option<String>,
    pub page: PageRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashtagRow {
    pub source: EntitySource,
    pub tag: String,
    pub page: PageRef,
}

/// A context-free named-entity annotation on a tweet's text.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRow {
    pub source: EntitySource,
    pub annotation_type: String,
    pub normalized_text: String,
    pub probability: Option<f64>,
    pub page: PageRef,
}

fn with_source<'a>(
    source: &'a EntitySource,
    columns: NamedParams<'a>,
    page: &'a PageRef,
) -> NamedParams<'a> {
    let mut params: NamedParams<'a> = Vec::with_capacity(columns.len() + 5);
    params.push((":source_id", &source.source_id));
    params.push((":source_type", &source.source_type));
    params.push((":field", &source.field));
    params.extend(columns);
    params.push((":source_file", &page.source_file));
    params.push((":source_page", &page.page_number));
    params
}

impl MetadataRow {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        vec![(":metadata_key", &self.key), (":metadata_value", &self.value)]
    }
}

impl PageRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        vec![
            (":source_file", &self.page.source_file),
            (":page_number", &self.page.page_number),
            (":oldest_id", &self.oldest_id),
            (":newest_id", &self.newest_id),
            (":result_count", &self.result_count),
            (":retrieved_at", &self.retrieved_at),
            (":request_url", &self.request_url),
            (":twarc_version", &self.twarc_version),
            (":additional_metadata", &self.additional_metadata),
        ]
    }
}

impl UserRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        vec![
            (":id", &self.id),
            (":username", &self.username),
            (":name", &self.name),
            (":description", &self.description),
            (":location", &self.location),
            (":url", &self.url),
            (":profile_image_url", &self.profile_image_url),
            (":created_at", &self.created_at),
            (":protected", &self.protected),
            (":verified", &self.verified),
            (":pinned_tweet_id", &self.pinned_tweet_id),
            (":followers_count", &self.followers_count),
            (":following_count", &self.following_count),
            (":tweet_count", &self.tweet_count),
            (":listed_count", &self.listed_count),
            (":directly_collected", &self.directly_collected),
            (":source_file", &self.page.source_file),
            (":source_page", &self.page.page_number),
        ]
    }
}

impl TweetRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        vec![
            (":id", &self.id),
            (":author_id", &self.author_id),
            (":text", &self.text),
            (":lang", &self.lang),
            (":source", &self.source),
            (":possibly_sensitive", &self.possibly_sensitive),
            (":reply_settings", &self.reply_settings),
            (":created_at", &self.created_at),
            (":conversation_id", &self.conversation_id),
            (":in_reply_to_user_id", &self.in_reply_to_user_id),
            (":retweeted_tweet_id", &self.retweeted_tweet_id),
            (":quoted_tweet_id", &self.quoted_tweet_id),
            (":replied_to_tweet_id", &self.replied_to_tweet_id),
            (":like_count", &self.like_count),
            (":quote_count", &self.quote_count),
            (":reply_count", &self.reply_count),
            (":retweet_count", &self.retweet_count),
            (":bookmark_count", &self.bookmark_count),
            (":impression_count", &self.impression_count),
            (":directly_collected", &self.directly_collected),
            (":source_file", &self.page.source_file),
            (":source_page", &self.page.page_number),
        ]
    }
}

impl MediaRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        vec![
            (":media_key", &self.media_key),
            (":type", &self.media_type),
            (":url", &self.url),
            (":preview_image_url", &self.preview_image_url),
            (":height", &self.height),
            (":width", &self.width),
            (":duration_ms", &self.duration_ms),
            (":alt_text", &self.alt_text),
            (":view_count", &self.view_count),
            (":source_file", &self.page.source_file),
            (":source_page", &self.page.page_number),
        ]
    }
}

impl TweetMediaRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        vec![
            (":tweet_id", &self.tweet_id),
            (":media_key", &self.media_key),
            (":source_file", &self.page.source_file),
            (":source_page", &self.page.page_number),
        ]
    }
}

impl UrlRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        with_source(
            &self.source,
            vec![
                (":url", &self.url),
                (":expanded_url", &self.expanded_url),
                (":display_url", &self.display_url),
                (":unwound_url", &self.unwound_url),
                (":title", &self.title),
                (":description", &self.description),
            ],
            &self.page,
        )
    }
}

impl HashtagRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        with_source(
            &self.source,
            vec![(":tag", &self.tag), (":tag_lower", &self.tag_lower)],
            &self.page,
        )
    }
}

impl MentionRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        with_source(
            &self.source,
            vec![(":username", &self.username), (":user_id", &self.user_id)],
            &self.page,
        )
    }
}

impl CashtagRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        with_source(&self.source, vec![(":tag", &self.tag)], &self.page)
    }
}

impl AnnotationRow {
    #[must_use]
    pub fn named_params(&self) -> NamedParams<'_> {
        with_source(
            &self.source,
            vec![
                (":annotation_type", &self.annotation_type),
                (":normalized_text", &self.normalized_text),
                (":probability", &self.probability),
            ],
            &self.page,
        )
    }
}

macro_rules! rows {
    ($($variant:ident($row:ty) => $table:ident),+ $(,)?) => {
        /// A row destined for one registered table.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Row {
            $($variant($row)),+
        }

        impl Row {
            #[must_use]
            pub const fn table(&self) -> Table {
                match self {
                    $(Self::$variant(_) => Table::$table),+
                }
            }

            #[must_use]
            pub fn named_params(&self) -> NamedParams<'_> {
                match self {
                    $(Self::$variant(row) => row.named_params()),+
                }
            }
        }

        $(
            impl From<$row> for Row {
                fn from(row: $row) -> Self {
                    Self::$variant(row)
                }
            }
        )+
    };
}

rows! {
    Metadata(MetadataRow) => Metadata,
    Page(PageRow) => ResultsPage,
    User(UserRow) => UserByPage,
    Tweet(TweetRow) => TweetByPage,
    Media(MediaRow) => Media,
    TweetMedia(TweetMediaRow) => TweetMedia,
    Url(UrlRow) => Url,
    Hashtag(HashtagRow) => Hashtag,
    Mention(MentionRow) => Mention,
    Cashtag(CashtagRow) => Cashtag,
    Annotation(AnnotationRow) => Annotation,
}

/// Rows produced by mapping one or more objects, grouped by target table.
///
/// Rows keep the order they were pushed in. Merging concatenates; duplicate
/// keys are left for the table's conflict policy to resolve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mappings {
    rows: BTreeMap<Table, Vec<Row>>,
}

impl Mappings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: impl Into<Row>) {
        let row = row.into();
        self.rows.entry(row.table()).or_default().push(row);
    }

    pub fn merge(&mut self, other: Self) {
        for (table, rows) in other.rows {
            self.rows.entry(table).or_default().extend(rows);
        }
    }

    /// Rows for one table, in push order.
    #[must_use]
    pub fn rows(&self, table: Table) -> &[Row] {
        self.rows.get(&table).map_or(&[], Vec::as_slice)
    }

    /// Tables with at least one row, in registration order.
    pub fn tables(&self) -> impl Iterator<Item = Table> + '_ {
        self.rows
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(table, _)| *table)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}
