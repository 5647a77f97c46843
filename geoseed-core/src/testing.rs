//! Testing utilities for the generator.
//!
//! This module provides in-memory stand-ins for the external collaborators:
//! - `MemoryAddressStore` for deterministic neighborhood queries
//! - `MemoryFeedStore` for capturing generated feeds and comments
//! - `ScriptedContent` for placeholder text without network calls

use crate::content::{ContentError, ContentSource};
use crate::distance::{Formula, GeoPoint, Unit};
use crate::model::{AddressId, ClusterMember, Comment, Feed};
use crate::store::{AddressStore, FeedStore, StoreError};
use async_trait::async_trait;
use loripsum::ParagraphSize;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Address store backed by a vector of points; address `id` is `points[id - 1]`.
pub struct MemoryAddressStore {
    points: Vec<GeoPoint>,
    formula: Formula,
    /// Scripted neighborhoods returned instead of a computed radius query.
    neighborhoods: HashMap<AddressId, Vec<ClusterMember>>,
    /// Ids that answer `NotFound` even though they are in range.
    missing: HashSet<AddressId>,
    /// Ids whose lookup fails with a query error.
    broken: HashSet<AddressId>,
    lookups: Mutex<Vec<AddressId>>,
    radius_queries: Mutex<usize>,
}

impl MemoryAddressStore {
    /// Create a store holding `points`, with ids starting at 1.
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self {
            points,
            formula: Formula::Haversine,
            neighborhoods: HashMap::new(),
            missing: HashSet::new(),
            broken: HashSet::new(),
            lookups: Mutex::new(Vec::new()),
            radius_queries: Mutex::new(0),
        }
    }

    /// A `rows` x `cols` grid of points `spacing` degrees apart, starting at `origin`.
    pub fn grid(origin: GeoPoint, rows: usize, cols: usize, spacing: f64) -> Self {
        let points = (0..rows)
            .flat_map(|r| {
                (0..cols).map(move |c| GeoPoint {
                    lon: origin.lon + c as f64 * spacing,
                    lat: origin.lat + r as f64 * spacing,
                })
            })
            .collect();
        Self::new(points)
    }

    /// Answer radius queries around `anchor` with `members` instead of computing them.
    pub fn with_neighborhood(mut self, anchor: AddressId, members: Vec<ClusterMember>) -> Self {
        self.neighborhoods.insert(anchor, members);
        self
    }

    /// Pretend these rows do not exist.
    pub fn with_missing(mut self, ids: impl IntoIterator<Item = AddressId>) -> Self {
        self.missing.extend(ids);
        self
    }

    /// Make lookups of these rows fail with a query error.
    pub fn with_broken(mut self, ids: impl IntoIterator<Item = AddressId>) -> Self {
        self.broken.extend(ids);
        self
    }

    /// Ids passed to `point_of`, in call order.
    pub fn lookups(&self) -> Vec<AddressId> {
        lock(&self.lookups).clone()
    }

    /// Number of radius queries served.
    pub fn radius_queries(&self) -> usize {
        *lock(&self.radius_queries)
    }

    fn get(&self, id: AddressId) -> Option<GeoPoint> {
        if id < 1 || self.missing.contains(&id) {
            return None;
        }
        self.points.get((id - 1) as usize).copied()
    }
}

#[async_trait]
impl AddressStore for MemoryAddressStore {
    async fn row_count(&self) -> Result<i64, StoreError> {
        Ok(self.points.len() as i64)
    }

    async fn point_of(&self, id: AddressId) -> Result<GeoPoint, StoreError> {
        lock(&self.lookups).push(id);
        if self.broken.contains(&id) {
            return Err(StoreError::Query {
                query: format!("point_of({id})"),
                message: "connection reset".to_string(),
            });
        }
        self.get(id)
            .ok_or_else(|| StoreError::not_found("addresses", id))
    }

    async fn within_radius(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<ClusterMember>, StoreError> {
        *lock(&self.radius_queries) += 1;

        let anchor = self
            .points
            .iter()
            .position(|p| *p == point)
            .map(|i| i as AddressId + 1);
        if let Some(members) = anchor.and_then(|id| self.neighborhoods.get(&id)) {
            return Ok(members.clone());
        }

        Ok(self
            .points
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.missing.contains(&(*i as AddressId + 1)))
            .map(|(i, p)| {
                ClusterMember::new(
                    i as AddressId + 1,
                    self.formula.distance(&point, p, Unit::Kilometers),
                )
            })
            .filter(|m| m.distance <= radius_km)
            .collect())
    }
}

/// Feed store that keeps every insert in memory.
#[derive(Default)]
pub struct MemoryFeedStore {
    existing_feeds: i64,
    existing_comments: i64,
    feeds: Mutex<Vec<Feed>>,
    comments: Mutex<Vec<Comment>>,
    fail_after_feeds: Option<usize>,
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with rows already present, as if an earlier run had seeded them.
    pub fn with_existing(mut self, feeds: i64, comments: i64) -> Self {
        self.existing_feeds = feeds;
        self.existing_comments = comments;
        self
    }

    /// Reject every feed insert after the first `count`.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after_feeds = Some(count);
        self
    }

    pub fn feeds(&self) -> Vec<Feed> {
        lock(&self.feeds).clone()
    }

    pub fn comments(&self) -> Vec<Comment> {
        lock(&self.comments).clone()
    }

    /// Comments belonging to one feed, in insert order.
    pub fn comments_for(&self, feed_id: i64) -> Vec<Comment> {
        lock(&self.comments)
            .iter()
            .filter(|c| c.parent_id == feed_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn feed_count(&self) -> Result<i64, StoreError> {
        Ok(self.existing_feeds + lock(&self.feeds).len() as i64)
    }

    async fn comment_count(&self) -> Result<i64, StoreError> {
        Ok(self.existing_comments + lock(&self.comments).len() as i64)
    }

    async fn insert_feed(&self, feed: &Feed) -> Result<(), StoreError> {
        let mut feeds = lock(&self.feeds);
        if self.fail_after_feeds.is_some_and(|max| feeds.len() >= max) {
            return Err(StoreError::Write {
                query: format!("insert_feed({})", feed.id),
                message: "disk full".to_string(),
            });
        }
        feeds.push(feed.clone());
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        lock(&self.comments).push(comment.clone());
        Ok(())
    }
}

/// Content source that answers deterministically and records every request.
#[derive(Default)]
pub struct ScriptedContent {
    requests: Mutex<Vec<(u32, ParagraphSize)>>,
    fail: bool,
}

impl ScriptedContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose every request fails with a network error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(u32, ParagraphSize)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ContentSource for ScriptedContent {
    async fn paragraphs(&self, count: u32, size: ParagraphSize) -> Result<String, ContentError> {
        lock(&self.requests).push((count, size));
        if self.fail {
            return Err(ContentError::Network("connection refused".to_string()));
        }
        Ok(vec![format!("Lorem ipsum ({size})."); count as usize].join("\n\n"))
    }
}
