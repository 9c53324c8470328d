//! Entity mapper: twarc JSON fragments to typed table rows.
//!
//! Every function here is pure. A mapper takes one upstream object plus the
//! page it was observed on and returns [`Mappings`] for every table the object
//! touches. Optional upstream fields that are absent or `null` become explicit
//! `None` values; a present field of the wrong JSON type is an error rather
//! than silently dropped data.

use crate::error::{Result, TidyTweetError};
use crate::model::{
    AnnotationRow, CashtagRow, EntitySource, HashtagRow, Mappings, MediaRow, MentionRow,
    MetadataRow, OwnerKind, PageRef, PageRow, TweetMediaRow, TweetRow, UrlRow, UserRow,
};
use crate::schema::{LIBRARY_VERSION, SchemaRegistry};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

/// Keys of the page envelope that map to dedicated columns or tables.
const PAGE_SECTIONS: [&str; 4] = ["data", "includes", "meta", "__twarc"];
const META_COLUMNS: [&str; 3] = ["oldest_id", "newest_id", "result_count"];
const TWARC_COLUMNS: [&str; 3] = ["url", "version", "retrieved_at"];

/// Typed read access to the fields of one JSON object.
///
/// An absent nested object behaves like an empty one, so optional sections
/// such as `public_metrics` need no special casing at the call site.
#[derive(Debug, Clone, Copy)]
struct Fields<'a> {
    object: &'static str,
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    fn of(object: &'static str, value: &'a Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                object,
                map: Some(map),
            }),
            _ => Err(TidyTweetError::invalid_field(object, "<root>", "an object")),
        }
    }

    /// A present, non-null value.
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map
            .and_then(|map| map.get(field))
            .filter(|value| !value.is_null())
    }

    fn entries(self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.map.into_iter().flat_map(|map| map.iter())
    }

    fn required_text(&self, field: &'static str) -> Result<String> {
        self.text(field)?
            .ok_or_else(|| TidyTweetError::missing_field(self.object, field))
    }

    /// Text values; ids are accepted as JSON numbers too.
    fn text(&self, field: &str) -> Result<Option<String>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(TidyTweetError::invalid_field(self.object, field, "a string")),
        }
    }

    fn integer(&self, field: &str) -> Result<Option<i64>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| TidyTweetError::invalid_field(self.object, field, "an integer")),
            Some(Value::String(s)) => s
                .parse()
                .map(Some)
                .map_err(|_| TidyTweetError::invalid_field(self.object, field, "an integer")),
            Some(_) => Err(TidyTweetError::invalid_field(self.object, field, "an integer")),
        }
    }

    fn float(&self, field: &str) -> Result<Option<f64>> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| TidyTweetError::invalid_field(self.object, field, "a number")),
        }
    }

    fn boolean(&self, field: &str) -> Result<Option<bool>> {
        match self.get(field) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| TidyTweetError::invalid_field(self.object, field, "a boolean")),
        }
    }

    fn nested(&self, field: &str) -> Result<Self> {
        match self.get(field) {
            None => Ok(Self {
                object: self.object,
                map: None,
            }),
            Some(Value::Object(map)) => Ok(Self {
                object: self.object,
                map: Some(map),
            }),
            Some(_) => Err(TidyTweetError::invalid_field(self.object, field, "an object")),
        }
    }

    fn array(&self, field: &str) -> Result<&'a [Value]> {
        match self.get(field) {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(TidyTweetError::invalid_field(self.object, field, "an array")),
        }
    }
}

/// Outbound references of a tweet, one per relation type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TweetReferences {
    pub retweeted: Option<String>,
    pub quoted: Option<String>,
    pub replied_to: Option<String>,
}

/// Classify a tweet's `referenced_tweets` list in a single pass.
///
/// When the same relation type appears more than once, the last entry wins.
/// Unknown relation types are skipped.
///
/// # Errors
///
/// Returns an error if an entry is not an object or lacks `type` or `id`.
pub fn resolve_references(referenced: &[Value]) -> Result<TweetReferences> {
    referenced
        .iter()
        .try_fold(TweetReferences::default(), |mut refs, entry| {
            let entry = Fields::of("referenced tweet", entry)?;
            let kind = entry.required_text("type")?;
            let id = entry.required_text("id")?;
            match kind.as_str() {
                "retweeted" => refs.retweeted = Some(id),
                "quoted" => refs.quoted = Some(id),
                "replied_to" => refs.replied_to = Some(id),
                other => debug!("Ignoring referenced tweet {} of unknown type '{}'", id, other),
            }
            Ok(refs)
        })
}

/// Fold a hashtag for case-insensitive grouping.
///
/// Canonical composition first, so that precomposed and combining-mark
/// spellings of the same tag fold to the same text, then full Unicode
/// lower-casing.
#[must_use]
pub fn normalise_hashtag(tag: &str) -> String {
    tag.nfc().collect::<String>().to_lowercase()
}

/// Normalise a retrieval timestamp to UTC RFC 3339 with microseconds.
///
/// Values that are not RFC 3339 are kept verbatim.
#[must_use]
pub fn normalise_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(timestamp) => timestamp
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Micros, false),
        Err(e) => {
            warn!("Keeping unparseable timestamp '{}' verbatim: {}", raw, e);
            raw.to_string()
        }
    }
}

/// The `_metadata` rows that stamp a store with its versions.
#[must_use]
pub fn map_library_metadata(registry: &SchemaRegistry) -> Mappings {
    let mut mappings = Mappings::new();
    mappings.push(MetadataRow::new("schema_version", registry.schema_version()));
    mappings.push(MetadataRow::new("tidy_tweet_version", LIBRARY_VERSION));
    mappings
}

/// Map the page envelope (`meta`, `__twarc` and any unrecognised top-level
/// keys) to a results page row.
///
/// # Errors
///
/// Returns an error if the page is not an object or a metadata field has the
/// wrong type.
pub fn map_page_metadata(page: &Value, page_ref: &PageRef) -> Result<PageRow> {
    let root = Fields::of("page", page)?;
    let meta = root.nested("meta")?;
    let twarc = root.nested("__twarc")?;

    let mut additional = Map::new();
    for (section, fields, columns) in [("meta", meta, META_COLUMNS), ("__twarc", twarc, TWARC_COLUMNS)] {
        let rest: Map<String, Value> = fields
            .entries()
            .filter(|(key, _)| !columns.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if !rest.is_empty() {
            additional.insert(section.to_string(), Value::Object(rest));
        }
    }
    for (key, value) in root.entries() {
        if !PAGE_SECTIONS.contains(&key.as_str()) {
            additional.insert(key.clone(), value.clone());
        }
    }

    Ok(PageRow {
        page: page_ref.clone(),
        oldest_id: meta.text("oldest_id")?,
        newest_id: meta.text("newest_id")?,
        result_count: meta.integer("result_count")?,
        retrieved_at: twarc.text("retrieved_at")?.map(|raw| normalise_timestamp(&raw)),
        request_url: twarc.text("url")?,
        twarc_version: twarc.text("version")?,
        additional_metadata: (!additional.is_empty())
            .then(|| Value::Object(additional).to_string()),
    })
}

/// Map one user object, including the entities in its profile fields.
///
/// # Errors
///
/// Returns an error if `id`, `username` or `name` is missing or any field
/// has the wrong type.
pub fn map_user(user: &Value, directly_collected: bool, page: &PageRef) -> Result<Mappings> {
    let fields = Fields::of("user", user)?;
    let metrics = fields.nested("public_metrics")?;
    let id = fields.required_text("id")?;

    let mut mappings = Mappings::new();
    mappings.push(UserRow {
        id: id.clone(),
        username: fields.required_text("username")?,
        name: Some(fields.required_text("name")?),
        description: fields.text("description")?,
        location: fields.text("location")?,
        url: fields.text("url")?,
        profile_image_url: fields.text("profile_image_url")?,
        created_at: fields.text("created_at")?,
        protected: fields.boolean("protected")?,
        verified: fields.boolean("verified")?,
        pinned_tweet_id: fields.text("pinned_tweet_id")?,
        followers_count: metrics.integer("followers_count")?,
        following_count: metrics.integer("following_count")?,
        tweet_count: metrics.integer("tweet_count")?,
        listed_count: metrics.integer("listed_count")?,
        directly_collected,
        page: page.clone(),
    });

    // User entities are grouped by the profile field they were found in.
    for (field, entities) in fields.nested("entities")?.entries() {
        let source = EntitySource::new(id.clone(), OwnerKind::User, field.clone());
        mappings.merge(map_entities(&source, entities, page)?);
    }

    Ok(mappings)
}

/// Map one tweet object with its references, media links and entities.
///
/// # Errors
///
/// Returns an error if `id`, `author_id` or `text` is missing or any field
/// has the wrong type.
pub fn map_tweet(tweet: &Value, directly_collected: bool, page: &PageRef) -> Result<Mappings> {
    let fields = Fields::of("tweet", tweet)?;
    let metrics = fields.nested("public_metrics")?;
    let id = fields.required_text("id")?;
    let references = resolve_references(fields.array("referenced_tweets")?)?;

    let mut mappings = Mappings::new();
    mappings.push(TweetRow {
        id: id.clone(),
        author_id: fields.required_text("author_id")?,
        text: fields.required_text("text")?,
        lang: fields.text("lang")?,
        source: fields.text("source")?,
        possibly_sensitive: fields.boolean("possibly_sensitive")?,
        reply_settings: fields.text("reply_settings")?,
        created_at: fields.text("created_at")?,
        conversation_id: fields.text("conversation_id")?,
        in_reply_to_user_id: fields.text("in_reply_to_user_id")?,
        retweeted_tweet_id: references.retweeted,
        quoted_tweet_id: references.quoted,
        replied_to_tweet_id: references.replied_to,
        like_count: metrics.integer("like_count")?,
        quote_count: metrics.integer("quote_count")?,
        reply_count: metrics.integer("reply_count")?,
        retweet_count: metrics.integer("retweet_count")?,
        bookmark_count: metrics.integer("bookmark_count")?,
        impression_count: metrics.integer("impression_count")?,
        directly_collected,
        page: page.clone(),
    });

    for key in fields.nested("attachments")?.array("media_keys")? {
        let media_key = key
            .as_str()
            .ok_or_else(|| TidyTweetError::invalid_field("tweet", "attachments.media_keys", "strings"))?;
        mappings.push(TweetMediaRow {
            tweet_id: id.clone(),
            media_key: media_key.to_string(),
            page: page.clone(),
        });
    }

    if let Some(entities) = fields.get("entities") {
        let source = EntitySource::new(id, OwnerKind::Tweet, "text");
        mappings.merge(map_entities(&source, entities, page)?);
    }

    Ok(mappings)
}

/// Map one media object from `includes.media`.
///
/// # Errors
///
/// Returns an error if `media_key` or `type` is missing or any field has
/// the wrong type.
pub fn map_media(media: &Value, page: &PageRef) -> Result<Mappings> {
    let fields = Fields::of("media", media)?;
    let metrics = fields.nested("public_metrics")?;

    let mut mappings = Mappings::new();
    mappings.push(MediaRow {
        media_key: fields.required_text("media_key")?,
        media_type: fields.required_text("type")?,
        url: fields.text("url")?,
        preview_image_url: fields.text("preview_image_url")?,
        height: fields.integer("height")?,
        width: fields.integer("width")?,
        duration_ms: fields.integer("duration_ms")?,
        alt_text: fields.text("alt_text")?,
        view_count: metrics.integer("view_count")?,
        page: page.clone(),
    });
    Ok(mappings)
}

/// Map an entities object to URL, hashtag, mention, cashtag and annotation
/// rows owned by `source`.
///
/// Shared by tweet bodies and user profile fields. Entity kinds are handled
/// in a fixed order; unknown kinds are ignored.
///
/// # Errors
///
/// Returns an error if an entity lacks its identifying value or any field
/// has the wrong type.
pub fn map_entities(source: &EntitySource, entities: &Value, page: &PageRef) -> Result<Mappings> {
    let fields = Fields::of("entities", entities)?;
    let mut mappings = Mappings::new();

    for entity in fields.array("urls")? {
        let url = Fields::of("url", entity)?;
        mappings.push(UrlRow {
            source: source.clone(),
            url: url.required_text("url")?,
            expanded_url: url.text("expanded_url")?,
            display_url: url.text("display_url")?,
            unwound_url: url.text("unwound_url")?,
            title: url.text("title")?,
            description: url.text("description")?,
            page: page.clone(),
        });
    }

    for entity in fields.array("hashtags")? {
        let tag = Fields::of("hashtag", entity)?.required_text("tag")?;
        mappings.push(HashtagRow {
            source: source.clone(),
            tag_lower: normalise_hashtag(&tag),
            tag,
            page: page.clone(),
        });
    }

    for entity in fields.array("mentions")? {
        let mention = Fields::of("mention", entity)?;
        mappings.push(MentionRow {
            source: source.clone(),
            username: mention.required_text("username")?,
            user_id: mention.text("id")?,
            page: page.clone(),
        });
    }

    for entity in fields.array("cashtags")? {
        mappings.push(CashtagRow {
            source: source.clone(),
            tag: Fields::of("cashtag", entity)?.required_text("tag")?,
            page: page.clone(),
        });
    }

    for entity in fields.array("annotations")? {
        let annotation = Fields::of("annotation", entity)?;
        mappings.push(AnnotationRow {
            source: source.clone(),
            annotation_type: annotation.required_text("type")?,
            normalized_text: annotation.required_text("normalized_text")?,
            probability: annotation.float("probability")?,
            page: page.clone(),
        });
    }

    for (kind, _) in fields.entries() {
        if !matches!(
            kind.as_str(),
            "urls" | "hashtags" | "mentions" | "cashtags" | "annotations"
        ) {
            debug!("Ignoring unknown entity kind '{}' on {}", kind, source.source_id);
        }
    }

    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;
    use crate::schema::Table;
    use serde_json::json;

    fn page() -> PageRef {
        PageRef::new("results.jsonl", 3)
    }

    fn tweet_rows(mappings: &Mappings) -> Vec<&TweetRow> {
        mappings
            .rows(Table::TweetByPage)
            .iter()
            .filter_map(|row| match row {
                Row::Tweet(tweet) => Some(tweet),
                _ => None,
            })
            .collect()
    }

    fn user_rows(mappings: &Mappings) -> Vec<&UserRow> {
        mappings
            .rows(Table::UserByPage)
            .iter()
            .filter_map(|row| match row {
                Row::User(user) => Some(user),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn user_without_location_maps_to_null() {
        let user = json!({
            "id": "12",
            "username": "jack",
            "name": "jack",
            "protected": false,
            "public_metrics": {"followers_count": 10, "tweet_count": 5}
        });
        let mappings = map_user(&user, false, &page()).unwrap();
        let users = user_rows(&mappings);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].location, None);
        assert_eq!(users[0].protected, Some(false));
        assert_eq!(users[0].followers_count, Some(10));
        assert_eq!(users[0].listed_count, None);
        assert!(!users[0].directly_collected);
        assert_eq!(users[0].page, page());
    }

    #[test]
    fn user_entities_keep_profile_field() {
        let user = json!({
            "id": "12",
            "username": "jack",
            "name": "jack",
            "entities": {
                "url": {"urls": [{"url": "https://t.co/a", "expanded_url": "https://example.com"}]},
                "description": {
                    "hashtags": [{"start": 0, "end": 4, "tag": "Rust"}],
                    "mentions": [{"username": "ferris"}]
                }
            }
        });
        let mappings = map_user(&user, true, &page()).unwrap();

        let Row::Url(url) = &mappings.rows(Table::Url)[0] else {
            panic!("expected url row");
        };
        assert_eq!(url.source, EntitySource::new("12", OwnerKind::User, "url"));
        assert_eq!(url.expanded_url.as_deref(), Some("https://example.com"));
        assert_eq!(url.display_url, None);

        let Row::Hashtag(tag) = &mappings.rows(Table::Hashtag)[0] else {
            panic!("expected hashtag row");
        };
        assert_eq!(tag.source.field, "description");
        assert_eq!(tag.tag_lower, "rust");

        let Row::Mention(mention) = &mappings.rows(Table::Mention)[0] else {
            panic!("expected mention row");
        };
        assert_eq!(mention.username, "ferris");
        assert_eq!(mention.user_id, None);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = map_user(&json!({"id": "1", "name": "x"}), true, &page()).unwrap_err();
        assert!(matches!(
            err,
            TidyTweetError::MissingField {
                object: "user",
                field: "username"
            }
        ));

        let err = map_tweet(&json!({"id": "1", "text": "x"}), true, &page()).unwrap_err();
        assert!(matches!(
            err,
            TidyTweetError::MissingField {
                object: "tweet",
                field: "author_id"
            }
        ));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let tweet = json!({"id": "1", "author_id": "2", "text": "x", "possibly_sensitive": "no"});
        let err = map_tweet(&tweet, true, &page()).unwrap_err();
        assert!(matches!(err, TidyTweetError::InvalidField { .. }));

        let err = map_tweet(&json!(["not", "an", "object"]), true, &page()).unwrap_err();
        assert!(matches!(err, TidyTweetError::InvalidField { .. }));
    }

    #[test]
    fn numeric_ids_map_to_text() {
        let tweet = json!({"id": 1_500_000_000_000_000_000_u64, "author_id": 7, "text": "hi"});
        let mappings = map_tweet(&tweet, true, &page()).unwrap();
        let tweets = tweet_rows(&mappings);
        assert_eq!(tweets[0].id, "1500000000000000000");
        assert_eq!(tweets[0].author_id, "7");
    }

    #[test]
    fn tweet_maps_metrics_media_and_entities() {
        let tweet = json!({
            "id": "100",
            "author_id": "12",
            "text": "Hello #ÜBER $TWTR @ferris https://t.co/x",
            "lang": "en",
            "possibly_sensitive": false,
            "public_metrics": {"like_count": 3, "retweet_count": 1, "reply_count": 0, "quote_count": 2},
            "attachments": {"media_keys": ["3_1", "3_2"]},
            "entities": {
                "hashtags": [{"tag": "ÜBER"}],
                "cashtags": [{"tag": "TWTR"}],
                "mentions": [{"username": "ferris", "id": "99"}],
                "urls": [{"url": "https://t.co/x", "unwound_url": "https://example.com/x", "title": "Example"}],
                "annotations": [{"type": "Organization", "normalized_text": "Rust", "probability": 0.75}]
            }
        });
        let mappings = map_tweet(&tweet, true, &page()).unwrap();
        let tweets = tweet_rows(&mappings);
        assert_eq!(tweets[0].like_count, Some(3));
        assert_eq!(tweets[0].bookmark_count, None);
        assert!(tweets[0].directly_collected);

        assert_eq!(mappings.rows(Table::TweetMedia).len(), 2);
        assert_eq!(mappings.rows(Table::Cashtag).len(), 1);
        let Row::Hashtag(tag) = &mappings.rows(Table::Hashtag)[0] else {
            panic!("expected hashtag row");
        };
        assert_eq!(tag.source, EntitySource::new("100", OwnerKind::Tweet, "text"));
        assert_eq!(tag.tag_lower, "über");
        let Row::Mention(mention) = &mappings.rows(Table::Mention)[0] else {
            panic!("expected mention row");
        };
        assert_eq!(mention.user_id.as_deref(), Some("99"));
        let Row::Annotation(annotation) = &mappings.rows(Table::Annotation)[0] else {
            panic!("expected annotation row");
        };
        assert_eq!(annotation.probability, Some(0.75));
    }

    #[test]
    fn references_last_occurrence_wins() {
        let refs = resolve_references(&[
            json!({"type": "replied_to", "id": "1"}),
            json!({"type": "quoted", "id": "2"}),
            json!({"type": "replied_to", "id": "3"}),
            json!({"type": "mystery", "id": "4"}),
        ])
        .unwrap();
        assert_eq!(
            refs,
            TweetReferences {
                retweeted: None,
                quoted: Some("2".into()),
                replied_to: Some("3".into()),
            }
        );
        assert_eq!(resolve_references(&[]).unwrap(), TweetReferences::default());
    }

    #[test]
    fn hashtag_folding_is_unicode_aware() {
        assert_eq!(normalise_hashtag("ÜBER"), normalise_hashtag("über"));
        assert_eq!(normalise_hashtag("ÜBER"), "über");
        // U+0055 U+0308 (decomposed) folds like U+00DC (precomposed).
        assert_eq!(normalise_hashtag("U\u{308}BER"), "über");
    }

    #[test]
    fn media_maps_view_count() {
        let media = json!({
            "media_key": "7_1",
            "type": "video",
            "duration_ms": 1000,
            "public_metrics": {"view_count": 55}
        });
        let mappings = map_media(&media, &page()).unwrap();
        let Row::Media(row) = &mappings.rows(Table::Media)[0] else {
            panic!("expected media row");
        };
        assert_eq!(row.media_type, "video");
        assert_eq!(row.view_count, Some(55));
        assert_eq!(row.url, None);

        assert!(map_media(&json!({"type": "photo"}), &page()).is_err());
    }

    #[test]
    fn page_metadata_keeps_leftovers() {
        let envelope = json!({
            "data": [],
            "meta": {"newest_id": "9", "oldest_id": "1", "result_count": 2, "next_token": "abc"},
            "__twarc": {
                "url": "https://api.twitter.com/2/tweets/search/recent?query=rust",
                "version": "2.10.4",
                "retrieved_at": "2022-03-10T16:38:58+11:00"
            },
            "errors": [{"title": "Not Found Error"}]
        });
        let row = map_page_metadata(&envelope, &page()).unwrap();
        assert_eq!(row.oldest_id.as_deref(), Some("1"));
        assert_eq!(row.result_count, Some(2));
        assert_eq!(row.twarc_version.as_deref(), Some("2.10.4"));
        assert_eq!(row.retrieved_at.as_deref(), Some("2022-03-10T05:38:58.000000+00:00"));

        let extra: Value = serde_json::from_str(row.additional_metadata.as_deref().unwrap()).unwrap();
        assert_eq!(
            extra,
            json!({"meta": {"next_token": "abc"}, "errors": [{"title": "Not Found Error"}]})
        );
    }

    #[test]
    fn page_metadata_without_leftovers() {
        let row = map_page_metadata(&json!({"data": []}), &page()).unwrap();
        assert_eq!(row.additional_metadata, None);
        assert_eq!(row.retrieved_at, None);
        assert_eq!(row.page.page_number, 3);
    }

    #[test]
    fn timestamps_normalise_to_utc() {
        assert_eq!(
            normalise_timestamp("2022-03-10T05:38:58.123456+00:00"),
            "2022-03-10T05:38:58.123456+00:00"
        );
        assert_eq!(normalise_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn library_metadata_rows() {
        let registry = SchemaRegistry::with_schema_version("2022-03-10").unwrap();
        let mappings = map_library_metadata(&registry);
        let pairs: Vec<_> = mappings
            .rows(Table::Metadata)
            .iter()
            .map(|row| match row {
                Row::Metadata(m) => (m.key.as_str(), m.value.as_str()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            pairs,
            [("schema_version", "2022-03-10"), ("tidy_tweet_version", LIBRARY_VERSION)]
        );
    }
}
