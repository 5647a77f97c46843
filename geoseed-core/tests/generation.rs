//! End-to-end tests for feed generation.
//!
//! These drive `FeedGenerator` against the in-memory address grid, a
//! recording feed store and scripted text, checking what ends up stored.
//! Run with: `cargo test -p geoseed-core --test generation`

use chrono::{DateTime, Duration, TimeZone, Utc};
use geoseed_core::distance::{Formula, GeoPoint, Unit};
use geoseed_core::{
    CommenterSelection, ContentError, FeedGenerator, GeneratorConfig, MemoryAddressStore,
    MemoryFeedStore, ParagraphSize, ScriptedContent, SeedError, StoreError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn town() -> MemoryAddressStore {
    MemoryAddressStore::grid(GeoPoint { lon: 11.0, lat: 47.0 }, 25, 40, 0.05)
}

fn eight_am() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap()
}

fn small_days() -> GeneratorConfig {
    GeneratorConfig {
        min_feeds_per_day: 10,
        feed_spread: 5,
        ..GeneratorConfig::default()
    }
}

// =============================================================================
// One day, 150 feeds
// =============================================================================

#[tokio::test]
async fn test_feed_ids_continue_after_existing_rows() {
    let addresses = town();
    let feeds = MemoryFeedStore::new().with_existing(41, 100);
    let content = ScriptedContent::new();
    let generator =
        FeedGenerator::new(&addresses, &feeds, &content, GeneratorConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(42);

    let report = generator
        .generate_feeds(&mut rng, 1, eight_am(), 150)
        .await
        .unwrap();

    let stored = feeds.feeds();
    assert_eq!(stored.len(), 150);
    let ids: Vec<i64> = stored.iter().map(|f| f.id).collect();
    assert_eq!(ids, (42..=191).collect::<Vec<_>>());
    assert_eq!(report.first_feed_id, 42);
    assert_eq!(report.last_feed_id, 191);
    assert_eq!(report.feeds, 150);
    assert!(report.anchor_attempts >= 150);

    let comments = feeds.comments();
    assert_eq!(report.comments, comments.len() as u64);
    let comment_ids: Vec<i64> = comments.iter().map(|c| c.id).collect();
    assert_eq!(comment_ids, (101..101 + comments.len() as i64).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_feeds_stay_inside_the_window() {
    let addresses = town();
    let feeds = MemoryFeedStore::new();
    let content = ScriptedContent::new();
    let generator =
        FeedGenerator::new(&addresses, &feeds, &content, GeneratorConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    generator
        .generate_feeds(&mut rng, 1, eight_am(), 150)
        .await
        .unwrap();

    let stored = feeds.feeds();
    let window_end = eight_am() + Duration::hours(10);
    assert!(stored
        .iter()
        .all(|f| f.created_at >= eight_am() && f.created_at < window_end));
    assert!(stored.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    // 15 per hour
    for (i, feed) in stored.iter().enumerate() {
        assert_eq!((feed.created_at - eight_am()).num_hours(), (i / 15) as i64);
    }
}

#[tokio::test]
async fn test_comments_follow_their_feed() {
    let addresses = town();
    let feeds = MemoryFeedStore::new();
    let content = ScriptedContent::new();
    let config = GeneratorConfig::default();
    let generator = FeedGenerator::new(&addresses, &feeds, &content, config.clone()).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);

    generator
        .generate_feeds(&mut rng, 1, eight_am(), 40)
        .await
        .unwrap();

    for feed in feeds.feeds() {
        let comments = feeds.comments_for(feed.id);
        assert!(!comments.is_empty());
        assert!(comments.len() < config.max_comments as usize);

        let mut last = feed.created_at;
        for comment in &comments {
            assert!(comment.created_at >= last);
            assert!(comment.created_at - last < Duration::seconds(3600));
            assert!(!comment.reviewed);
            last = comment.created_at;
        }

        let authors: HashSet<_> = comments.iter().map(|c| c.user_id).collect();
        assert_eq!(authors.len(), comments.len(), "author commented twice on {}", feed.id);

        for comment in &comments {
            let index = (comment.user_id - 1) as usize;
            let author = GeoPoint {
                lon: 11.0 + (index % 40) as f64 * 0.05,
                lat: 47.0 + (index / 40) as f64 * 0.05,
            };
            let d = Formula::Haversine.distance(&feed.point, &author, Unit::Kilometers);
            assert!(d <= config.radius_km + 1e-9, "author {} is {d} km away", comment.user_id);
        }
    }
}

#[tokio::test]
async fn test_feed_is_owned_by_anchor() {
    let addresses = town();
    let feeds = MemoryFeedStore::new();
    let content = ScriptedContent::new();
    let generator = FeedGenerator::new(&addresses, &feeds, &content, small_days()).unwrap();
    let mut rng = StdRng::seed_from_u64(5);

    generator
        .generate_feeds(&mut rng, 1, eight_am(), 20)
        .await
        .unwrap();

    for feed in feeds.feeds() {
        assert!((1..1000).contains(&feed.user_id));
        let index = (feed.user_id - 1) as usize;
        assert_eq!(feed.point.lon, 11.0 + (index % 40) as f64 * 0.05);
        assert_eq!(feed.point.lat, 47.0 + (index / 40) as f64 * 0.05);
        assert!(!feed.content.is_empty());
        assert!(feed.slug.is_empty() && feed.category.is_empty());
        assert!(feed.images.is_empty());
        assert_eq!(feed.reactions.total(), 0);
        assert!(!feed.reviewed);
    }
}

#[tokio::test]
async fn test_text_requests_respect_bounds() {
    let addresses = town();
    let feeds = MemoryFeedStore::new();
    let content = ScriptedContent::new();
    let generator = FeedGenerator::new(&addresses, &feeds, &content, small_days()).unwrap();
    let mut rng = StdRng::seed_from_u64(11);

    let report = generator
        .generate_feeds(&mut rng, 1, eight_am(), 30)
        .await
        .unwrap();

    let requests = content.requests();
    assert_eq!(requests.len() as u64, 30 + report.comments);
    assert!(requests
        .iter()
        .all(|(_, size)| *size != ParagraphSize::Large));
    assert!(requests.iter().any(|(_, size)| *size == ParagraphSize::Medium));
    assert!(requests.iter().any(|(_, size)| *size == ParagraphSize::Small));

    // Feed bodies take 1..=5 paragraphs, comments 1..=2.
    assert!(requests.iter().all(|(n, _)| (1..6).contains(n)));
    for feed in feeds.feeds() {
        let paragraphs = feed.content.split("\n\n").count();
        assert!((1..6).contains(&paragraphs));
    }
    for comment in feeds.comments() {
        let paragraphs = comment.content.split("\n\n").count();
        assert!((1..3).contains(&paragraphs));
    }
}

#[tokio::test]
async fn test_same_seed_same_day() {
    let addresses = town();
    let content = ScriptedContent::new();

    let first = MemoryFeedStore::new();
    let second = MemoryFeedStore::new();
    for store in [&first, &second] {
        let generator = FeedGenerator::new(&addresses, store, &content, small_days()).unwrap();
        let mut rng = StdRng::seed_from_u64(31337);
        generator
            .generate_day(&mut rng, 1, eight_am())
            .await
            .unwrap();
    }

    assert_eq!(first.feeds(), second.feeds());
    assert_eq!(first.comments(), second.comments());
}

#[tokio::test]
async fn test_generate_day_draws_feed_count() {
    let addresses = town();
    let content = ScriptedContent::new();

    for seed in 0..3 {
        let feeds = MemoryFeedStore::new();
        let generator =
            FeedGenerator::new(&addresses, &feeds, &content, GeneratorConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        let report = generator
            .generate_day(&mut rng, 1, eight_am())
            .await
            .unwrap();
        assert!((150..250).contains(&report.feeds));
        assert_eq!(feeds.feeds().len(), report.feeds as usize);
    }
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_insert_failure_aborts_the_day() {
    let addresses = town();
    let feeds = MemoryFeedStore::new().failing_after(3);
    let content = ScriptedContent::new();
    let generator = FeedGenerator::new(&addresses, &feeds, &content, small_days()).unwrap();
    let mut rng = StdRng::seed_from_u64(9);

    let err = generator
        .generate_feeds(&mut rng, 1, eight_am(), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, SeedError::Store(StoreError::Write { .. })));
    assert_eq!(feeds.feeds().len(), 3);
}

#[tokio::test]
async fn test_content_failure_aborts_the_day() {
    let addresses = town();
    let feeds = MemoryFeedStore::new();
    let content = ScriptedContent::failing();
    let generator = FeedGenerator::new(&addresses, &feeds, &content, small_days()).unwrap();
    let mut rng = StdRng::seed_from_u64(9);

    let err = generator
        .generate_feeds(&mut rng, 1, eight_am(), 10)
        .await
        .unwrap_err();

    assert!(matches!(err, SeedError::Content(ContentError::Network(_))));
    assert!(feeds.feeds().is_empty());
}

#[tokio::test]
async fn test_invalid_config_touches_nothing() {
    let addresses = town();
    let feeds = MemoryFeedStore::new();
    let content = ScriptedContent::new();

    let config = GeneratorConfig {
        max_comments: 1,
        ..GeneratorConfig::default()
    };
    let result = FeedGenerator::new(&addresses, &feeds, &content, config);

    assert!(matches!(result, Err(SeedError::Config(_))));
    assert!(addresses.lookups().is_empty());
    assert_eq!(addresses.radius_queries(), 0);
    assert!(content.requests().is_empty());
}

// =============================================================================
// Walk commenters and multi-day runs
// =============================================================================

#[tokio::test]
async fn test_walk_commenters_live_nearby() {
    let addresses = town();
    let feeds = MemoryFeedStore::new();
    let content = ScriptedContent::new();
    let config = GeneratorConfig {
        commenters: CommenterSelection::Walk { offset: 40 },
        max_walk_lookups: Some(10_000),
        ..small_days()
    };
    let generator = FeedGenerator::new(&addresses, &feeds, &content, config.clone()).unwrap();
    let mut rng = StdRng::seed_from_u64(77);

    generator
        .generate_feeds(&mut rng, 1, eight_am(), 10)
        .await
        .unwrap();

    for feed in feeds.feeds() {
        for comment in feeds.comments_for(feed.id) {
            assert_ne!(comment.user_id, feed.user_id);
            let index = (comment.user_id - 1) as usize;
            let author = GeoPoint {
                lon: 11.0 + (index % 40) as f64 * 0.05,
                lat: 47.0 + (index / 40) as f64 * 0.05,
            };
            let d = Formula::LawOfCosines.distance(&feed.point, &author, Unit::Kilometers);
            assert!(d < config.radius_km);
        }
    }
}

#[tokio::test]
async fn test_seed_days_runs_oldest_first() {
    let addresses = town();
    let feeds = MemoryFeedStore::new();
    let content = ScriptedContent::new();
    let generator = FeedGenerator::new(&addresses, &feeds, &content, small_days()).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let now = Utc.with_ymd_and_hms(2024, 6, 5, 13, 27, 0).unwrap();

    let reports = generator.seed_days(&mut rng, 2, &now).await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].day, 2);
    assert_eq!(reports[0].start, Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap());
    assert_eq!(reports[1].day, 1);
    assert_eq!(reports[1].start, Utc.with_ymd_and_hms(2024, 6, 4, 8, 0, 0).unwrap());
    assert_eq!(reports[1].first_feed_id, reports[0].last_feed_id + 1);

    let stored = feeds.feeds();
    let (day_two, day_one) = stored.split_at(reports[0].feeds as usize);
    assert!(day_two
        .iter()
        .all(|f| f.created_at >= reports[0].start && f.created_at < reports[0].start + Duration::hours(10)));
    assert!(day_one
        .iter()
        .all(|f| f.created_at >= reports[1].start && f.created_at < reports[1].start + Duration::hours(10)));
}

#[tokio::test]
async fn test_seed_days_rejects_unrepresentable_day_count() {
    let addresses = town();
    let feeds = MemoryFeedStore::new();
    let content = ScriptedContent::new();
    let generator = FeedGenerator::new(&addresses, &feeds, &content, small_days()).unwrap();
    let mut rng = StdRng::seed_from_u64(3);

    for days in [u64::MAX, 1 << 40] {
        let err = generator.seed_days(&mut rng, days, &eight_am()).await.unwrap_err();
        assert!(matches!(err, SeedError::Clock(d) if d == days), "got {err:?}");
    }
    assert!(feeds.feeds().is_empty());
    assert!(addresses.lookups().is_empty());
    assert!(content.requests().is_empty());
}
