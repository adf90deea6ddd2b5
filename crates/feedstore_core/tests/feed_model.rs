use chrono::{TimeZone, Utc};
use feedstore_core::{CachedFeed, FeedImage};
use url::Url;
use uuid::Uuid;

fn sample_image() -> FeedImage {
    FeedImage::new(
        Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap(),
        Some("Sunset".to_string()),
        None,
        Url::parse("https://images.example.com/sunset.jpg").unwrap(),
    )
}

#[test]
fn feed_image_exposes_constructor_values() {
    let image = sample_image();

    assert_eq!(
        image.id().to_string(),
        "11111111-2222-4333-8444-555555555555"
    );
    assert_eq!(image.description(), Some("Sunset"));
    assert_eq!(image.location(), None);
    assert_eq!(image.url().host_str(), Some("images.example.com"));
}

#[test]
fn cached_feed_serialization_uses_expected_wire_fields() {
    let timestamp = Utc.with_ymd_and_hms(2024, 2, 13, 10, 0, 0).unwrap();
    let cache = CachedFeed::new(vec![sample_image()], timestamp);

    let json = serde_json::to_value(&cache).unwrap();
    assert_eq!(json["timestamp"], "2024-02-13T10:00:00Z");
    assert_eq!(json["feed"][0]["id"], "11111111-2222-4333-8444-555555555555");
    assert_eq!(json["feed"][0]["description"], "Sunset");
    assert!(json["feed"][0]["location"].is_null());
    assert_eq!(json["feed"][0]["url"], "https://images.example.com/sunset.jpg");

    let decoded: CachedFeed = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, cache);
    assert!(!decoded.is_empty());
}
