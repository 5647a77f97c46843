//! Linear search through address ids for a nearby address.

use crate::distance::{Formula, GeoPoint, Unit};
use crate::model::AddressId;
use crate::random::{below, coin_flip};
use crate::store::{AddressStore, StoreError};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from a linear walk.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No address within {threshold_km} km of {start_id} after {lookups} lookups")]
    Exhausted {
        start_id: AddressId,
        threshold_km: f64,
        lookups: u64,
    },
}

/// Walks address ids from a random offset until one lies close enough.
pub struct LinearWalker<'a, S: AddressStore + ?Sized> {
    store: &'a S,
    formula: Formula,
    max_lookups: Option<u64>,
}

impl<'a, S: AddressStore + ?Sized> LinearWalker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            formula: Formula::LawOfCosines,
            max_lookups: None,
        }
    }

    pub fn with_formula(mut self, formula: Formula) -> Self {
        self.formula = formula;
        self
    }

    /// Stop after `lookups` row fetches instead of walking forever.
    pub fn with_max_lookups(mut self, lookups: Option<u64>) -> Self {
        self.max_lookups = lookups;
        self
    }

    /// Find the next id, other than `start_id`, whose address is closer than
    /// `threshold_km` to `start_point`.
    ///
    /// The walk starts at `start_id` plus a random signed offset of magnitude
    /// below `offset_budget` and steps forward one id at a time. The first
    /// missing row mirrors the offset through `start_id`; a second consecutive
    /// miss rolls a fresh offset. Any other store error ends the walk.
    pub async fn next_within_radius<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        start_id: AddressId,
        offset_budget: u64,
        start_point: GeoPoint,
        threshold_km: f64,
    ) -> Result<(AddressId, GeoPoint), WalkError> {
        let mut already_flipped = false;
        let mut offset = self.roll_offset(rng, offset_budget);
        let mut next = start_id.saturating_add(offset);
        let mut lookups = 0u64;

        loop {
            if next == start_id {
                next = next.wrapping_add(1);
                continue;
            }

            if let Some(max) = self.max_lookups {
                if lookups >= max {
                    return Err(WalkError::Exhausted {
                        start_id,
                        threshold_km,
                        lookups,
                    });
                }
            }
            lookups += 1;

            match self.store.point_of(next).await {
                Ok(point) => {
                    let distance = self.formula.distance(&point, &start_point, Unit::Kilometers);
                    if distance < threshold_km {
                        trace!(start_id, found = next, distance, lookups, "walk finished");
                        return Ok((next, point));
                    }
                    next = next.wrapping_add(1);
                }
                Err(e) if e.is_not_found() => {
                    if !already_flipped {
                        debug!(start_id, missing = next, "missing row, mirroring offset");
                        next = start_id.saturating_sub(offset);
                        already_flipped = true;
                    } else {
                        debug!(start_id, missing = next, "missing row again, new offset");
                        already_flipped = false;
                        offset = self.roll_offset(rng, offset_budget);
                        next = start_id.saturating_add(offset);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Budgets past `i64::MAX` are clamped so the magnitude never turns negative.
    fn roll_offset<R: Rng + ?Sized>(&self, rng: &mut R, offset_budget: u64) -> i64 {
        let magnitude = i64::try_from(below(offset_budget, rng)).unwrap_or(i64::MAX);
        coin_flip(magnitude, rng)
    }
}
