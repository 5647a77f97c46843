//! Store interfaces the generator reads addresses from and writes feeds to.
//!
//! Implementations live outside this crate (a SQL database in the CLI, the
//! in-memory doubles in [`crate::testing`]).

use crate::distance::GeoPoint;
use crate::model::{AddressId, ClusterMember, Comment, Feed};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row does not exist. The only store error callers may recover from.
    #[error("No row with id {id} in {table}")]
    NotFound { table: String, id: i64 },

    #[error("Query failed: {message} (query: {query})")]
    Query { query: String, message: String },

    #[error("Write failed: {message} (query: {query})")]
    Write { query: String, message: String },
}

impl StoreError {
    pub fn not_found(table: impl Into<String>, id: i64) -> Self {
        StoreError::NotFound {
            table: table.into(),
            id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Read-only geospatial lookup over address rows.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Number of address rows. Ids are dense, so this is also the last id.
    async fn row_count(&self) -> Result<i64, StoreError>;

    /// Coordinates of one address, in degrees.
    async fn point_of(&self, id: AddressId) -> Result<GeoPoint, StoreError>;

    /// Every address within `radius_km` of `point`, annotated with its distance.
    async fn within_radius(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<ClusterMember>, StoreError>;
}

/// Write-only sink for generated feeds and comments.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn feed_count(&self) -> Result<i64, StoreError>;

    async fn comment_count(&self) -> Result<i64, StoreError>;

    async fn insert_feed(&self, feed: &Feed) -> Result<(), StoreError>;

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError>;
}
