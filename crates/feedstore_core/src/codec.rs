//! Record codec between domain feed items and their stored form.
//!
//! # Responsibility
//! - Flatten `FeedImage` into a `StoredRecord` of plain strings.
//! - Rebuild `FeedImage` values from stored records, validating ids and urls.
//!
//! # Invariants
//! - Encoding is total.
//! - Decoding a sequence is lossy but never fatal: records whose id is not a
//!   UUID or whose url is not an absolute URL are skipped, and the survivors
//!   keep their relative order. The number of skipped records is reported in
//!   `DecodedFeed::dropped`.

use crate::model::feed::{CachedFeed, FeedImage};
use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

/// Flat, storage-friendly shape of one feed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: String,
}

/// Stored shape of the cache aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCache {
    pub records: Vec<StoredRecord>,
    pub timestamp: DateTime<Utc>,
}

/// Result of decoding a stored cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFeed {
    pub cache: CachedFeed,
    /// Records skipped because they failed validation.
    pub dropped: usize,
}

pub fn encode(image: &FeedImage) -> StoredRecord {
    StoredRecord {
        id: image.id().to_string(),
        description: image.description().map(str::to_owned),
        location: image.location().map(str::to_owned),
        url: image.url().to_string(),
    }
}

/// Returns `None` when the stored id or url does not parse.
pub fn decode(record: &StoredRecord) -> Option<FeedImage> {
    let id = Uuid::parse_str(&record.id).ok()?;
    let url = Url::parse(&record.url).ok()?;
    Some(FeedImage::new(
        id,
        record.description.clone(),
        record.location.clone(),
        url,
    ))
}

pub fn encode_feed(feed: &[FeedImage], timestamp: DateTime<Utc>) -> StoredCache {
    StoredCache {
        records: feed.iter().map(encode).collect(),
        timestamp,
    }
}

pub fn decode_feed(stored: &StoredCache) -> DecodedFeed {
    let feed = stored.records.iter().filter_map(decode).collect::<Vec<_>>();
    let dropped = stored.records.len() - feed.len();
    DecodedFeed {
        cache: CachedFeed::new(feed, stored.timestamp),
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, decode_feed, encode, encode_feed, StoredRecord};
    use crate::model::feed::FeedImage;
    use chrono::{TimeZone, Utc};
    use url::Url;
    use uuid::Uuid;

    fn image(description: Option<&str>, location: Option<&str>) -> FeedImage {
        FeedImage::new(
            Uuid::new_v4(),
            description.map(str::to_owned),
            location.map(str::to_owned),
            Url::parse("https://images.example.com/a.png?size=large").unwrap(),
        )
    }

    #[test]
    fn encode_stringifies_id_and_url() {
        let image = image(Some("a description"), None);
        let record = encode(&image);

        assert_eq!(record.id, image.id().to_string());
        assert_eq!(record.url, "https://images.example.com/a.png?size=large");
        assert_eq!(record.description.as_deref(), Some("a description"));
        assert_eq!(record.location, None);
        assert_eq!(decode(&record), Some(image));
    }

    #[test]
    fn decode_rejects_invalid_id() {
        let record = StoredRecord {
            id: "not-a-uuid".to_string(),
            description: None,
            location: None,
            url: "https://example.com".to_string(),
        };
        assert_eq!(decode(&record), None);
    }

    #[test]
    fn decode_rejects_relative_or_malformed_url() {
        for url in ["images/a.png", "", "http://[::1"] {
            let record = StoredRecord {
                id: Uuid::new_v4().to_string(),
                description: None,
                location: Some("somewhere".to_string()),
                url: url.to_string(),
            };
            assert_eq!(decode(&record), None, "url `{url}` should not decode");
        }
    }

    #[test]
    fn decode_feed_skips_bad_records_and_keeps_order() {
        let first = image(None, None);
        let second = image(Some("second"), Some("Lisbon"));
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        let mut stored = encode_feed(&[first.clone(), second.clone()], timestamp);
        stored.records.insert(
            1,
            StoredRecord {
                id: "broken".to_string(),
                description: None,
                location: None,
                url: "https://example.com".to_string(),
            },
        );

        let decoded = decode_feed(&stored);
        assert_eq!(decoded.dropped, 1);
        assert_eq!(decoded.cache.feed, vec![first, second]);
        assert_eq!(decoded.cache.timestamp, timestamp);
    }

    #[test]
    fn decode_feed_of_empty_cache_keeps_timestamp() {
        let timestamp = Utc::now();
        let decoded = decode_feed(&encode_feed(&[], timestamp));
        assert!(decoded.cache.is_empty());
        assert_eq!(decoded.dropped, 0);
        assert_eq!(decoded.cache.timestamp, timestamp);
    }
}
