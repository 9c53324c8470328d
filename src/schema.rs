//! Schema registry for the tidy-tweet database.
//!
//! The registry is the single catalogue of every table the store holds: its
//! `CREATE TABLE` statement, the columns its parameterized insert binds, and
//! the conflict policy that insert uses. Both storage initialisation and page
//! ingestion read from it, so the on-disk layout and the insert contract can
//! never drift apart. Views that collapse per-page observations into logical
//! entities are registered here too.
//!
//! The registry validates itself when constructed; a table missing a create
//! statement or an insert column list is a defect reported before any
//! database is touched.

use crate::error::{Result, TidyTweetError};
use std::collections::HashSet;
use std::fmt::Write;

/// Version of the relational layout. Bump whenever a column changes.
pub const SCHEMA_VERSION: &str = "2023-06-22";

/// Version of this library, recorded alongside the schema version.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Every table tidy-tweet creates, in registration order.
///
/// Registration order is also insert order, so tables referenced by foreign
/// keys come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Metadata,
    ResultsPage,
    UserByPage,
    TweetByPage,
    Media,
    TweetMedia,
    Url,
    Hashtag,
    Mention,
    Cashtag,
    Annotation,
}

impl Table {
    pub const ALL: [Self; 11] = [
        Self::Metadata,
        Self::ResultsPage,
        Self::UserByPage,
        Self::TweetByPage,
        Self::Media,
        Self::TweetMedia,
        Self::Url,
        Self::Hashtag,
        Self::Mention,
        Self::Cashtag,
        Self::Annotation,
    ];

    /// Name of the table in the database.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Metadata => "_metadata",
            Self::ResultsPage => "results_page",
            Self::UserByPage => "user_by_page",
            Self::TweetByPage => "tweet_by_page",
            Self::Media => "media",
            Self::TweetMedia => "tweet_media",
            Self::Url => "url",
            Self::Hashtag => "hashtag",
            Self::Mention => "mention",
            Self::Cashtag => "cashtag",
            Self::Annotation => "annotation",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What an insert does when the row's primary key is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Fail the insert (and with it, the page).
    Abort,
    /// Keep the existing row; first write wins.
    Ignore,
    /// Overwrite the existing row; last write wins.
    Replace,
}

impl ConflictPolicy {
    const fn insert_verb(self) -> &'static str {
        match self {
            Self::Abort => "insert into",
            Self::Ignore => "insert or ignore into",
            Self::Replace => "insert or replace into",
        }
    }
}

/// Static description of one table.
struct TableSpec {
    table: Table,
    create: &'static str,
    columns: &'static [&'static str],
    on_conflict: ConflictPolicy,
}

/// A registered table with its generated insert statement.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    pub table: Table,
    pub columns: &'static [&'static str],
    pub on_conflict: ConflictPolicy,
    create: &'static str,
    insert: String,
}

impl TableDefinition {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.table.name()
    }

    /// The `CREATE TABLE` statement, optionally with SQLite's `strict` modifier.
    #[must_use]
    pub fn create_statement(&self, strict: bool) -> String {
        let body = self.create.trim().trim_end_matches(';').trim_end();
        if strict {
            format!("{body} strict")
        } else {
            body.to_string()
        }
    }

    /// Parameterized insert binding one `:column` parameter per column.
    #[must_use]
    pub fn insert(&self) -> &str {
        &self.insert
    }
}

/// A derived, read-only view over the raw tables.
#[derive(Debug, Clone, Copy)]
pub struct ViewDefinition {
    pub name: &'static str,
    pub create: &'static str,
}

/// The fixed catalogue of tables and views for one schema version.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schema_version: String,
    tables: Vec<TableDefinition>,
}

impl SchemaRegistry {
    /// Build and validate the registry for [`SCHEMA_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`TidyTweetError::SchemaDefinition`] if any table is missing
    /// its create statement or insert columns, or names a column its create
    /// statement does not define.
    pub fn new() -> Result<Self> {
        Self::with_schema_version(SCHEMA_VERSION)
    }

    /// Build the registry but stamp stores with a different schema version.
    ///
    /// Intended for compatibility testing; the table layout is unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`SchemaRegistry::new`].
    pub fn with_schema_version(schema_version: impl Into<String>) -> Result<Self> {
        validate_specs(TABLE_SPECS)?;

        let tables = TABLE_SPECS
            .iter()
            .map(|spec| TableDefinition {
                table: spec.table,
                columns: spec.columns,
                on_conflict: spec.on_conflict,
                create: spec.create,
                insert: build_insert(spec),
            })
            .collect();

        Ok(Self {
            schema_version: schema_version.into(),
            tables,
        })
    }

    #[must_use]
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Table definitions in registration order.
    #[must_use]
    pub fn table_definitions(&self) -> &[TableDefinition] {
        &self.tables
    }

    /// Definition of a single table.
    #[must_use]
    pub fn definition(&self, table: Table) -> &TableDefinition {
        // Validation guarantees `tables` is indexed exactly like `Table::ALL`.
        &self.tables[table as usize]
    }

    /// Create statements for every table, in registration order.
    #[must_use]
    pub fn create_statements(&self, strict: bool) -> Vec<String> {
        self.tables
            .iter()
            .map(|definition| definition.create_statement(strict))
            .collect()
    }

    /// Views over the raw tables, in creation order.
    #[must_use]
    pub const fn views(&self) -> &'static [ViewDefinition] {
        VIEWS
    }

    /// The full schema as a SQL script.
    #[must_use]
    pub fn schema_sql(&self, strict: bool) -> String {
        let mut sql = String::new();
        for statement in self.create_statements(strict) {
            let _ = writeln!(sql, "{statement};\n");
        }
        for view in self.views() {
            let _ = writeln!(sql, "{};\n", view.create.trim());
        }
        sql
    }
}

fn build_insert(spec: &TableSpec) -> String {
    let columns = spec.columns.join(",\n    ");
    let params = spec
        .columns
        .iter()
        .map(|column| format!(":{column}"))
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!(
        "{} {} (\n    {columns}\n) values (\n    {params}\n)",
        spec.on_conflict.insert_verb(),
        spec.table.name()
    )
}

fn validate_specs(specs: &[TableSpec]) -> Result<()> {
    if specs.len() != Table::ALL.len() {
        return Err(TidyTweetError::SchemaDefinition {
            table: "<registry>",
            reason: format!(
                "{} tables declared but {} registered",
                Table::ALL.len(),
                specs.len()
            ),
        });
    }

    for (spec, expected) in specs.iter().zip(Table::ALL) {
        let table = spec.table.name();
        if spec.table != expected {
            return Err(TidyTweetError::SchemaDefinition {
                table,
                reason: format!("registered out of order; expected '{expected}' here"),
            });
        }

        let create = spec.create.trim().to_lowercase();
        let prefix = format!("create table {table} (");
        if !create.starts_with(&prefix) {
            return Err(TidyTweetError::SchemaDefinition {
                table,
                reason: "missing create statement".to_string(),
            });
        }
        if spec.columns.is_empty() {
            return Err(TidyTweetError::SchemaDefinition {
                table,
                reason: "missing insert columns".to_string(),
            });
        }

        let defined = defined_columns(&create);
        for column in spec.columns {
            if !defined.contains(column) {
                return Err(TidyTweetError::SchemaDefinition {
                    table,
                    reason: format!("insert column '{column}' is not defined by the create statement"),
                });
            }
        }
    }

    Ok(())
}

/// Column names declared in a create statement: the first word of each
/// top-level line, ignoring comments and table constraints.
fn defined_columns(create: &str) -> HashSet<&str> {
    create
        .lines()
        .skip(1)
        .filter_map(|line| {
            let line = line.split("--").next().unwrap_or_default().trim();
            let word = line.split_whitespace().next()?;
            let word = word.trim_end_matches(',');
            match word {
                "" | ")" | "primary" | "foreign" | "unique" | "check" | "constraint" => None,
                column => Some(column),
            }
        })
        .collect()
}

// =============================================================================
// Tables
// =============================================================================

const TABLE_SPECS: &[TableSpec] = &[
    TableSpec {
        table: Table::Metadata,
        create: r"
create table _metadata (
    metadata_key text primary key,
    metadata_value text
)",
        columns: &["metadata_key", "metadata_value"],
        on_conflict: ConflictPolicy::Replace,
    },
    TableSpec {
        table: Table::ResultsPage,
        create: r"
create table results_page (
    source_file text not null, -- file the page was read from
    page_number integer not null, -- 1-based line number of the page within its file
    oldest_id text,
    newest_id text,
    result_count integer,
    retrieved_at text, -- UTC, RFC 3339
    request_url text,
    twarc_version text,
    additional_metadata text, -- JSON object of any other meta/__twarc keys
    primary key (source_file, page_number)
)",
        columns: &[
            "source_file",
            "page_number",
            "oldest_id",
            "newest_id",
            "result_count",
            "retrieved_at",
            "request_url",
            "twarc_version",
            "additional_metadata",
        ],
        on_conflict: ConflictPolicy::Abort,
    },
    TableSpec {
        table: Table::UserByPage,
        create: USER_BY_PAGE_CREATE,
        columns: &[
            "id",
            "username",
            "name",
            "description",
            "location",
            "url",
            "profile_image_url",
            "created_at",
            "protected",
            "verified",
            "pinned_tweet_id",
            "followers_count",
            "following_count",
            "tweet_count",
            "listed_count",
            "directly_collected",
            "source_file",
            "source_page",
        ],
        on_conflict: ConflictPolicy::Ignore,
    },
    TableSpec {
        table: Table::TweetByPage,
        create: TWEET_BY_PAGE_CREATE,
        columns: &[
            "id",
            "author_id",
            "text",
            "lang",
            "source",
            "possibly_sensitive",
            "reply_settings",
            "created_at",
            "conversation_id",
            "in_reply_to_user_id",
            "retweeted_tweet_id",
            "quoted_tweet_id",
            "replied_to_tweet_id",
            "like_count",
            "quote_count",
            "reply_count",
            "retweet_count",
            "bookmark_count",
            "impression_count",
            "directly_collected",
            "source_file",
            "source_page",
        ],
        on_conflict: ConflictPolicy::Ignore,
    },
    TableSpec {
        table: Table::Media,
        create: r"
create table media (
    media_key text primary key,
    type text not null, -- photo, video, animated_gif
    url text,
    preview_image_url text,
    height integer,
    width integer,
    duration_ms integer,
    alt_text text,
    view_count integer,
    source_file text not null,
    source_page integer not null,
    foreign key (source_file, source_page) references results_page (source_file, page_number)
)",
        columns: &[
            "media_key",
            "type",
            "url",
            "preview_image_url",
            "height",
            "width",
            "duration_ms",
            "alt_text",
            "view_count",
            "source_file",
            "source_page",
        ],
        on_conflict: ConflictPolicy::Replace,
    },
    TableSpec {
        table: Table::TweetMedia,
        create: r"
create table tweet_media (
    tweet_id text not null,
    media_key text not null,
    source_file text not null,
    source_page integer not null,
    primary key (tweet_id, media_key),
    foreign key (source_file, source_page) references results_page (source_file, page_number)
)",
        columns: &["tweet_id", "media_key", "source_file", "source_page"],
        on_conflict: ConflictPolicy::Ignore,
    },
    TableSpec {
        table: Table::Url,
        create: r"
create table url (
    source_id text not null, -- id of the tweet or user the URL appears in
    source_type text not null, -- 'tweet' or 'user'
    field text not null, -- field of the source object, e.g. 'text', 'description'
    url text not null, -- t.co shortened URL
    expanded_url text,
    display_url text,
    unwound_url text,
    title text,
    description text,
    source_file text not null,
    source_page integer not null,
    primary key (source_id, source_type, field, url),
    foreign key (source_file, source_page) references results_page (source_file, page_number)
)",
        columns: &[
            "source_id",
            "source_type",
            "field",
            "url",
            "expanded_url",
            "display_url",
            "unwound_url",
            "title",
            "description",
            "source_file",
            "source_page",
        ],
        on_conflict: ConflictPolicy::Ignore,
    },
    TableSpec {
        table: Table::Hashtag,
        create: r"
create table hashtag (
    source_id text not null,
    source_type text not null,
    field text not null,
    tag text not null,
    tag_lower text not null, -- Unicode lower case of tag, for case-insensitive grouping
    source_file text not null,
    source_page integer not null,
    primary key (source_id, source_type, field, tag),
    foreign key (source_file, source_page) references results_page (source_file, page_number)
)",
        columns: &[
            "source_id",
            "source_type",
            "field",
            "tag",
            "tag_lower",
            "source_file",
            "source_page",
        ],
        on_conflict: ConflictPolicy::Ignore,
    },
    TableSpec {
        table: Table::Mention,
        create: r"
create table mention (
    source_id text not null,
    source_type text not null,
    field text not null,
    username text not null, -- username of the mentioned user
    user_id text,
    source_file text not null,
    source_page integer not null,
    primary key (source_id, source_type, field, username),
    foreign key (source_file, source_page) references results_page (source_file, page_number)
)",
        columns: &[
            "source_id",
            "source_type",
            "field",
            "username",
            "user_id",
            "source_file",
            "source_page",
        ],
        on_conflict: ConflictPolicy::Ignore,
    },
    TableSpec {
        table: Table::Cashtag,
        create: r"
create table cashtag (
    source_id text not null,
    source_type text not null,
    field text not null,
    tag text not null,
    source_file text not null,
    source_page integer not null,
    primary key (source_id, source_type, field, tag),
    foreign key (source_file, source_page) references results_page (source_file, page_number)
)",
        columns: &[
            "source_id",
            "source_type",
            "field",
            "tag",
            "source_file",
            "source_page",
        ],
        on_conflict: ConflictPolicy::Ignore,
    },
    TableSpec {
        table: Table::Annotation,
        create: r"
create table annotation (
    source_id text not null,
    source_type text not null,
    field text not null,
    annotation_type text not null, -- e.g. Person, Place, Organization
    normalized_text text not null,
    probability real,
    source_file text not null,
    source_page integer not null,
    primary key (source_id, source_type, field, annotation_type, normalized_text),
    foreign key (source_file, source_page) references results_page (source_file, page_number)
)",
        columns: &[
            "source_id",
            "source_type",
            "field",
            "annotation_type",
            "normalized_text",
            "probability",
            "source_file",
            "source_page",
        ],
        on_conflict: ConflictPolicy::Ignore,
    },
];

const USER_BY_PAGE_CREATE: &str = r"
create table user_by_page (
    id text not null,
    username text not null,
    name text,
    description text,
    location text,
    url text,
    profile_image_url text,
    created_at text,
    protected integer, -- boolean
    verified integer, -- boolean
    pinned_tweet_id text,
    followers_count integer,
    following_count integer,
    tweet_count integer,
    listed_count integer,
    directly_collected integer not null, -- boolean: found in 'data' rather than 'includes'
    source_file text not null,
    source_page integer not null,
    primary key (id, source_file, source_page),
    foreign key (source_file, source_page) references results_page (source_file, page_number)
)";

const TWEET_BY_PAGE_CREATE: &str = r"
create table tweet_by_page (
    id text not null,
    author_id text not null,
    text text not null,
    lang text,
    source text,
    possibly_sensitive integer, -- boolean
    reply_settings text,
    created_at text,
    conversation_id text,
    in_reply_to_user_id text,
    retweeted_tweet_id text,
    quoted_tweet_id text,
    replied_to_tweet_id text,
    like_count integer,
    quote_count integer,
    reply_count integer,
    retweet_count integer,
    bookmark_count integer,
    impression_count integer,
    directly_collected integer not null, -- boolean: found in 'data' rather than 'includes'
    source_file text not null,
    source_page integer not null,
    primary key (id, source_file, source_page),
    foreign key (source_file, source_page) references results_page (source_file, page_number)
)";

// =============================================================================
// Views
// =============================================================================

const VIEWS: &[ViewDefinition] = &[
    ViewDefinition {
        name: "tweet",
        create: r"
create view tweet as
select
    id, author_id, text, lang, source, possibly_sensitive, reply_settings,
    created_at, conversation_id, in_reply_to_user_id,
    retweeted_tweet_id, quoted_tweet_id, replied_to_tweet_id,
    like_count, quote_count, reply_count, retweet_count,
    bookmark_count, impression_count,
    directly_collected, source_file, source_page, retrieved_at
from (
    select
        t.*,
        p.retrieved_at as retrieved_at,
        row_number() over (
            partition by t.id
            order by p.retrieved_at desc, t.source_file desc, t.source_page desc
        ) as observation_rank
    from tweet_by_page as t
    join results_page as p
        on p.source_file = t.source_file and p.page_number = t.source_page
)
where observation_rank = 1
",
    },
    ViewDefinition {
        name: "user",
        create: r"
create view user as
select
    id, username, name, description, location, url, profile_image_url,
    created_at, protected, verified, pinned_tweet_id,
    followers_count, following_count, tweet_count, listed_count,
    directly_collected, source_file, source_page, retrieved_at
from (
    select
        u.*,
        p.retrieved_at as retrieved_at,
        row_number() over (
            partition by u.id
            order by p.retrieved_at desc, u.source_file desc, u.source_page desc
        ) as observation_rank
    from user_by_page as u
    join results_page as p
        on p.source_file = u.source_file and p.page_number = u.source_page
)
where observation_rank = 1
",
    },
    ViewDefinition {
        name: "results_file",
        create: r"
create view results_file as
select
    source_file,
    count(*) as page_count,
    cast(min(cast(oldest_id as integer)) as text) as oldest_id,
    cast(max(cast(newest_id as integer)) as text) as newest_id,
    sum(result_count) as result_count,
    min(retrieved_at) as first_retrieved_at,
    max(retrieved_at) as last_retrieved_at
from results_page
group by source_file
",
    },
];
