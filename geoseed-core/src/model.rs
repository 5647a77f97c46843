//! Records read from and written to the stores.

use crate::distance::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dense, 1-based address row id.
pub type AddressId = i64;

/// Maximum number of image references a feed can carry.
pub const MAX_FEED_IMAGES: usize = 5;

/// An address row. Loaded once by the bulk loader, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub point: GeoPoint,
    pub number: String,
    pub street: String,
    pub unit: String,
    pub city: String,
    pub district: String,
    pub region: String,
    pub postcode: String,
}

/// An address found near an anchor, with its distance from the anchor in km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub id: AddressId,
    pub distance: f64,
}

impl ClusterMember {
    pub fn new(id: AddressId, distance: f64) -> Self {
        Self { id, distance }
    }
}

/// Reaction counters on a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reactions {
    pub happy: u32,
    pub love: u32,
    pub funny: u32,
    pub shocked: u32,
    pub sad: u32,
    pub angry: u32,
}

impl Reactions {
    pub fn total(&self) -> u64 {
        [
            self.happy,
            self.love,
            self.funny,
            self.shocked,
            self.sad,
            self.angry,
        ]
        .iter()
        .map(|&c| c as u64)
        .sum()
    }
}

/// A generated feed post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    /// Owning user, an address id.
    pub user_id: AddressId,
    pub slug: String,
    pub category: String,
    pub content: String,
    /// Image references, at most [`MAX_FEED_IMAGES`].
    pub images: Vec<String>,
    pub reactions: Reactions,
    /// Copied from the owning address when the feed is created.
    pub point: GeoPoint,
    pub reviewed: bool,
    pub created_at: DateTime<Utc>,
}

impl Feed {
    pub fn new(id: i64, user_id: AddressId, point: GeoPoint, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            slug: String::new(),
            category: String::new(),
            content: String::new(),
            images: Vec::new(),
            reactions: Reactions::default(),
            point,
            reviewed: false,
            created_at,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Image reference in slot `index` (0-based), empty when unused.
    pub fn image(&self, index: usize) -> &str {
        self.images.get(index).map(String::as_str).unwrap_or("")
    }
}

/// A generated comment on a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub parent_id: i64,
    pub user_id: AddressId,
    pub content: String,
    pub reviewed: bool,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(id: i64, parent: &Feed, user_id: AddressId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            parent_id: parent.id,
            user_id,
            content: String::new(),
            reviewed: false,
            created_at,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_feed_defaults() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let feed = Feed::new(42, 7, GeoPoint { lon: 11.4, lat: 47.2 }, at).with_content("hi");

        assert_eq!(feed.reactions.total(), 0);
        assert!(!feed.reviewed);
        assert_eq!(feed.image(0), "");
        assert_eq!(feed.image(MAX_FEED_IMAGES - 1), "");
        assert_eq!(feed.content, "hi");
    }

    #[test]
    fn test_comment_links_parent() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let feed = Feed::new(9, 1, GeoPoint::default(), at);
        let comment = Comment::new(3, &feed, 77, at);

        assert_eq!(comment.parent_id, 9);
        assert_eq!(comment.user_id, 77);
        assert!(comment.content.is_empty());
    }
}
