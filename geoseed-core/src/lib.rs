//! Geospatial clustering and synthetic social-feed generation.
//!
//! This crate provides:
//! - Great-circle distance (law of cosines and Haversine)
//! - Radius-bounded neighborhood sampling around random anchors
//! - A linear id walk for finding nearby addresses
//! - Day-by-day feed and comment generation driven by a single random stream
//!
//! Stores and the text source are traits; the CLI plugs in a database and
//! the loripsum client, tests plug in the doubles from [`testing`].
//!
//! # Quick Start
//!
//! ```ignore
//! use geoseed_core::{FeedGenerator, GeneratorConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let generator = FeedGenerator::new(&addresses, &feeds, &loripsum, GeneratorConfig::default())?;
//! let reports = generator.seed_days(&mut rng, 7, &chrono::Local::now()).await?;
//! ```

pub mod content;
pub mod distance;
pub mod error;
pub mod generator;
pub mod model;
pub mod random;
pub mod sampler;
pub mod store;
pub mod testing;
pub mod walker;

// Primary public API
pub use content::{ContentError, ContentSource};
pub use distance::{Formula, GeoError, GeoPoint, Unit, EARTH_RADIUS_KM, EARTH_RADIUS_MI};
pub use error::SeedError;
pub use generator::{CommenterSelection, DayPlan, DayReport, FeedGenerator, GeneratorConfig};
pub use loripsum::ParagraphSize;
pub use model::{Address, AddressId, ClusterMember, Comment, Feed, Reactions};
pub use random::{coin_flip, days_ago};
pub use sampler::{stratified_sample, Cluster, NeighborhoodSampler, SampleError};
pub use store::{AddressStore, FeedStore, StoreError};
pub use testing::{MemoryAddressStore, MemoryFeedStore, ScriptedContent};
pub use walker::{LinearWalker, WalkError};
