//! Synthetic feed and comment generation for simulated days.
//!
//! A day is a fixed window of hours starting at 08:00. Feeds are spread
//! evenly over the hours of the window; inside an hour every feed waits a
//! random delay after the previous one. Each feed is owned by the anchor of a
//! freshly sampled neighborhood, and every member of that neighborhood leaves
//! one comment, each a random delay after the previous comment.

use crate::content::ContentSource;
use crate::distance::{Formula, GeoPoint};
use crate::error::SeedError;
use crate::model::{AddressId, ClusterMember, Comment, Feed};
use crate::random::{below, days_ago};
use crate::sampler::NeighborhoodSampler;
use crate::store::{AddressStore, FeedStore};
use crate::walker::LinearWalker;
use chrono::{DateTime, Duration, TimeZone, Utc};
use loripsum::ParagraphSize;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, trace};

const SECONDS_PER_HOUR: u64 = 3600;

/// How comment authors are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommenterSelection {
    /// Each sampled cluster member comments once.
    #[default]
    Cluster,
    /// One comment per cluster member, but the author is found by walking
    /// address ids from the feed owner with the given offset budget.
    Walk { offset: u64 },
}

/// Knobs for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Neighborhood radius around each feed owner.
    pub radius_km: f64,
    /// Feeds per day are `min_feeds_per_day + random(0, feed_spread)`.
    pub min_feeds_per_day: u32,
    pub feed_spread: u32,
    /// Length of the posting window, starting at the day's 08:00.
    pub window_hours: u32,
    /// Exclusive upper bound of paragraphs per feed.
    pub max_feed_paragraphs: u32,
    /// Exclusive upper bound of paragraphs per comment.
    pub max_comment_paragraphs: u32,
    /// Exclusive upper bound of comments per feed.
    pub max_comments: u32,
    /// Exclusive upper bound of the gap between consecutive comments.
    pub max_comment_delay_secs: u64,
    pub commenters: CommenterSelection,
    /// Formula the walker uses to judge proximity.
    pub formula: Formula,
    pub max_anchor_attempts: Option<u32>,
    pub max_walk_lookups: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            radius_km: 25.0,
            min_feeds_per_day: 150,
            feed_spread: 100,
            window_hours: 10,
            max_feed_paragraphs: 6,
            max_comment_paragraphs: 3,
            max_comments: 20,
            max_comment_delay_secs: SECONDS_PER_HOUR,
            commenters: CommenterSelection::Cluster,
            formula: Formula::LawOfCosines,
            max_anchor_attempts: None,
            max_walk_lookups: None,
        }
    }
}

impl GeneratorConfig {
    /// Reject settings that would leave a random range empty.
    pub fn validate(&self) -> Result<(), SeedError> {
        if !(self.radius_km.is_finite() && self.radius_km > 0.0) {
            return Err(SeedError::config(format!(
                "radius must be a positive number of km, got {}",
                self.radius_km
            )));
        }
        if self.window_hours == 0 {
            return Err(SeedError::config("window must span at least one hour"));
        }
        for (name, value) in [
            ("max_feed_paragraphs", self.max_feed_paragraphs),
            ("max_comment_paragraphs", self.max_comment_paragraphs),
            ("max_comments", self.max_comments),
        ] {
            if value < 2 {
                return Err(SeedError::config(format!("{name} must be at least 2, got {value}")));
            }
        }
        if self.min_feeds_per_day == 0 && self.feed_spread == 0 {
            return Err(SeedError::config("a day must have at least one feed"));
        }
        if self.max_anchor_attempts == Some(0) {
            return Err(SeedError::config("max_anchor_attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Timestamps for one day's feeds.
///
/// `per_hour` feeds share each hour of the window. Inside an hour the random
/// delays accumulate, so timestamps never decrease and never leave their hour.
#[derive(Debug, Clone)]
pub struct DayPlan {
    start: DateTime<Utc>,
    total: u32,
    window_hours: u32,
    per_hour: u32,
    seconds_per_feed: u64,
    issued: u32,
    hour: u32,
    offset: u64,
}

impl DayPlan {
    pub fn new(start: DateTime<Utc>, total: u32, window_hours: u32) -> Self {
        let window_hours = window_hours.max(1);
        // Rounded up so the last feeds do not spill past the window.
        let per_hour = total.div_ceil(window_hours).max(1);
        Self {
            start,
            total,
            window_hours,
            per_hour,
            seconds_per_feed: SECONDS_PER_HOUR / per_hour as u64,
            issued: 0,
            hour: 0,
            offset: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn per_hour(&self) -> u32 {
        self.per_hour
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn window_end(&self) -> DateTime<Utc> {
        self.start + Duration::hours(self.window_hours as i64)
    }

    /// Timestamp of the next feed, or `None` once the day is used up.
    pub fn next_timestamp<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<DateTime<Utc>> {
        if self.issued >= self.total {
            return None;
        }

        let hour = self.issued / self.per_hour;
        if hour > self.hour {
            self.hour = hour;
            self.offset = 0;
        }

        let delay = below(self.seconds_per_feed, rng);
        let seconds = SECONDS_PER_HOUR * hour as u64 + self.offset + delay;
        self.offset += delay;
        self.issued += 1;

        Some(self.start + Duration::seconds(seconds as i64))
    }
}

/// Summary of one generated day.
#[derive(Debug, Clone)]
pub struct DayReport {
    pub day: u64,
    pub start: DateTime<Utc>,
    pub feeds: u32,
    pub comments: u64,
    /// Anchors drawn across all feeds, including rejected ones.
    pub anchor_attempts: u64,
    pub first_feed_id: i64,
    pub last_feed_id: i64,
    pub elapsed: std::time::Duration,
}

/// Drives sampling, text generation and persistence for simulated days.
pub struct FeedGenerator<'a, A, F, C>
where
    A: AddressStore + ?Sized,
    F: FeedStore + ?Sized,
    C: ContentSource + ?Sized,
{
    addresses: &'a A,
    feeds: &'a F,
    content: &'a C,
    config: GeneratorConfig,
}

impl<'a, A, F, C> FeedGenerator<'a, A, F, C>
where
    A: AddressStore + ?Sized,
    F: FeedStore + ?Sized,
    C: ContentSource + ?Sized,
{
    pub fn new(
        addresses: &'a A,
        feeds: &'a F,
        content: &'a C,
        config: GeneratorConfig,
    ) -> Result<Self, SeedError> {
        config.validate()?;
        Ok(Self {
            addresses,
            feeds,
            content,
            config,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate `days` days ending yesterday, oldest first.
    pub async fn seed_days<R: Rng + ?Sized, Tz: TimeZone>(
        &self,
        rng: &mut R,
        days: u64,
        now: &DateTime<Tz>,
    ) -> Result<Vec<DayReport>, SeedError> {
        // The oldest day is checked first so nothing is written for a span
        // the calendar cannot represent.
        if days > 0 && days_ago(now, days).is_none() {
            return Err(SeedError::Clock(days));
        }
        let mut reports = Vec::new();
        for day in (1..=days).rev() {
            let start = days_ago(now, day)
                .ok_or(SeedError::Clock(day))?
                .with_timezone(&Utc);
            reports.push(self.generate_day(rng, day, start).await?);
        }
        Ok(reports)
    }

    /// Generate a day with a random number of feeds starting at `start`.
    pub async fn generate_day<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        day: u64,
        start: DateTime<Utc>,
    ) -> Result<DayReport, SeedError> {
        let total = self.config.min_feeds_per_day + below(self.config.feed_spread as u64, rng) as u32;
        self.generate_feeds(rng, day, start, total).await
    }

    /// Generate exactly `total` feeds, with their comments, for one day.
    pub async fn generate_feeds<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        day: u64,
        start: DateTime<Utc>,
        total: u32,
    ) -> Result<DayReport, SeedError> {
        let started = Instant::now();
        info!(day, feeds = total, start = %start, "creating feeds");

        let sampler = NeighborhoodSampler::new(self.addresses)
            .with_max_attempts(self.config.max_anchor_attempts);

        let mut plan = DayPlan::new(start, total, self.config.window_hours);
        let mut last_feed_id = self.feeds.feed_count().await?;
        let mut last_comment_id = self.feeds.comment_count().await?;
        let first_feed_id = last_feed_id + 1;

        let mut comments = 0u64;
        let mut anchor_attempts = 0u64;
        let mut index = 0u32;

        while let Some(created_at) = plan.next_timestamp(rng) {
            last_feed_id += 1;

            let paragraphs = rng.gen_range(1..self.config.max_feed_paragraphs);
            let size = random_size(rng);
            let text = self.content.paragraphs(paragraphs, size).await?;

            let wanted = rng.gen_range(1..self.config.max_comments) as usize;
            let cluster = sampler
                .find_cluster(rng, self.config.radius_km, wanted)
                .await?;
            anchor_attempts += cluster.attempts as u64;

            let feed = Feed::new(last_feed_id, cluster.anchor, cluster.anchor_point, created_at)
                .with_content(text);
            self.feeds.insert_feed(&feed).await?;
            info!(
                day,
                feed = feed.id,
                progress = %format!("{}/{}", index + 1, total),
                user = feed.user_id,
                point = %feed.point,
                at = %feed.created_at,
                comments = cluster.members.len(),
                "feed created"
            );

            last_comment_id = self
                .create_comments(rng, &feed, &cluster.members, last_comment_id)
                .await?;
            comments += cluster.members.len() as u64;
            index += 1;
        }

        let elapsed = started.elapsed();
        info!(
            day,
            feeds = total,
            comments,
            elapsed_ms = %format!("{:.2}", elapsed.as_secs_f64() * 1000.0),
            "day complete"
        );

        Ok(DayReport {
            day,
            start,
            feeds: total,
            comments,
            anchor_attempts,
            first_feed_id,
            last_feed_id,
            elapsed,
        })
    }

    /// Write one comment per cluster member, each after the previous one.
    ///
    /// Returns the id of the last comment written.
    async fn create_comments<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        feed: &Feed,
        members: &[ClusterMember],
        mut last_comment_id: i64,
    ) -> Result<i64, SeedError> {
        let mut last_at = feed.created_at;

        for member in members {
            let author = self.pick_author(rng, feed, member).await?;

            last_at += Duration::seconds(below(self.config.max_comment_delay_secs, rng) as i64);

            let paragraphs = rng.gen_range(1..self.config.max_comment_paragraphs);
            let size = random_size(rng);
            let text = self.content.paragraphs(paragraphs, size).await?;

            last_comment_id += 1;
            let comment = Comment::new(last_comment_id, feed, author, last_at).with_content(text);
            self.feeds.insert_comment(&comment).await?;
            trace!(comment = comment.id, feed = feed.id, user = author, at = %last_at, "comment created");
        }

        Ok(last_comment_id)
    }

    async fn pick_author<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        feed: &Feed,
        member: &ClusterMember,
    ) -> Result<AddressId, SeedError> {
        match self.config.commenters {
            CommenterSelection::Cluster => Ok(member.id),
            CommenterSelection::Walk { offset } => {
                let walker = LinearWalker::new(self.addresses)
                    .with_formula(self.config.formula)
                    .with_max_lookups(self.config.max_walk_lookups);
                let (id, _point): (AddressId, GeoPoint) = walker
                    .next_within_radius(rng, feed.user_id, offset, feed.point, self.config.radius_km)
                    .await?;
                Ok(id)
            }
        }
    }
}

/// Small or medium paragraphs; large ones are never requested.
fn random_size<R: Rng + ?Sized>(rng: &mut R) -> ParagraphSize {
    ParagraphSize::from_index(below(2, rng) as usize).unwrap_or_default()
}
