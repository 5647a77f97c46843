//! Neighborhood sampling around random anchors.
//!
//! [`NeighborhoodSampler::find_cluster`] keeps drawing anchor addresses until
//! one has at least `sample_size` neighbors within the radius, then spreads a
//! fixed-size sample across that neighborhood with [`stratified_sample`].
//!
//! The retry loop assumes a dense population: at least `sample_size`
//! addresses must lie within the radius of most (more than half) anchors for
//! the search to finish in a handful of draws. Without a configured attempt
//! limit it will not give up on a sparse population.

use crate::distance::GeoPoint;
use crate::model::{AddressId, ClusterMember};
use crate::store::{AddressStore, StoreError};
use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Errors from cluster sampling.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Address population of {0} rows is too small to pick an anchor")]
    PopulationTooSmall(i64),

    #[error("Sample size must be at least 1")]
    EmptySample,

    #[error(
        "No anchor with {sample_size} neighbors within {radius_km} km after {attempts} attempts"
    )]
    Exhausted {
        sample_size: usize,
        radius_km: f64,
        attempts: u32,
    },
}

/// A sampled neighborhood.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// The anchor address; owns the feed the cluster comments on.
    pub anchor: AddressId,
    /// Anchor coordinates in degrees.
    pub anchor_point: GeoPoint,
    /// Exactly `sample_size` members with distinct ids.
    pub members: Vec<ClusterMember>,
    /// Size of the neighborhood the members were drawn from.
    pub candidates: usize,
    /// Number of anchors drawn, including the accepted one.
    pub attempts: u32,
}

/// Finds radius-bounded neighborhoods in an [`AddressStore`].
pub struct NeighborhoodSampler<'a, S: AddressStore + ?Sized> {
    store: &'a S,
    max_attempts: Option<u32>,
}

impl<'a, S: AddressStore + ?Sized> NeighborhoodSampler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            max_attempts: None,
        }
    }

    /// Give up after `attempts` anchors instead of searching forever.
    pub fn with_max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Pick an anchor with at least `sample_size` neighbors within
    /// `radius_km` and sample exactly `sample_size` of them.
    ///
    /// Anchors are drawn uniformly from `[1, row_count - 1]`; the last row is
    /// never an anchor. A failed lookup of the anchor itself is fatal.
    pub async fn find_cluster<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        radius_km: f64,
        sample_size: usize,
    ) -> Result<Cluster, SampleError> {
        if sample_size == 0 {
            return Err(SampleError::EmptySample);
        }

        let population = self.store.row_count().await?;
        if population < 2 {
            return Err(SampleError::PopulationTooSmall(population));
        }

        let mut attempts = 0u32;
        loop {
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    return Err(SampleError::Exhausted {
                        sample_size,
                        radius_km,
                        attempts,
                    });
                }
            }
            attempts += 1;

            let anchor = rng.gen_range(1..population);
            let anchor_point = self.store.point_of(anchor).await?;
            let neighbors = dedup_by_id(self.store.within_radius(anchor_point, radius_km).await?);

            if neighbors.len() < sample_size {
                debug!(
                    anchor,
                    found = neighbors.len(),
                    wanted = sample_size,
                    "neighborhood too small, retrying"
                );
                continue;
            }

            debug!(anchor, candidates = neighbors.len(), attempts, "neighborhood found");
            let members = stratified_sample(&neighbors, sample_size, rng);
            return Ok(Cluster {
                anchor,
                anchor_point,
                members,
                candidates: neighbors.len(),
                attempts,
            });
        }
    }
}

fn dedup_by_id(candidates: Vec<ClusterMember>) -> Vec<ClusterMember> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.id))
        .collect()
}

/// Draw `sample_size` distinct members spread across `candidates`.
///
/// The candidate list is cut into `sample_size` contiguous strata of width
/// `len / sample_size`. Each output slot draws a random stratum and a random
/// offset inside it, redrawing whenever the id was already picked. When the
/// strata would be empty (fewer candidates than `sample_size`) the leading
/// candidates are returned unchanged.
///
/// Candidate ids must be distinct.
pub fn stratified_sample<R: Rng + ?Sized>(
    candidates: &[ClusterMember],
    sample_size: usize,
    rng: &mut R,
) -> Vec<ClusterMember> {
    if sample_size == 0 {
        return Vec::new();
    }

    let width = candidates.len() / sample_size;
    if width == 0 {
        return candidates.iter().take(sample_size).copied().collect();
    }

    let mut used = HashSet::with_capacity(sample_size);
    let mut samples = Vec::with_capacity(sample_size);
    while samples.len() < sample_size {
        let stratum = rng.gen_range(0..sample_size);
        let target = stratum * width + rng.gen_range(0..width);
        let candidate = candidates[target];
        if !used.insert(candidate.id) {
            continue;
        }
        samples.push(candidate);
    }
    samples
}
