//! Command-line configuration.
//!
//! Connection flags are global and fall back to `GEOSEED_*` environment
//! variables, which may come from a `.env` file.

use crate::logging::LogFormat;
use crate::pg::QueryType;
use clap::{Args, Parser, Subcommand};
use geoseed_core::{CommenterSelection, Formula, GeneratorConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "geoseed",
    version,
    about = "Time geospatial queries in PostgreSQL and seed it with synthetic feeds"
)]
pub struct Cli {
    #[command(flatten)]
    pub db: DbArgs,

    /// Only show warnings and errors; `select` skips per-row output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Default log level, ignored when RUST_LOG is set.
    #[arg(long, global = true, default_value = "info", env = "GEOSEED_LOG_LEVEL")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Level the subscriber starts at after `--quiet` is applied.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else {
            &self.log_level
        }
    }
}

/// PostgreSQL connection settings.
#[derive(Args, Debug, Clone)]
pub struct DbArgs {
    #[arg(long, global = true, default_value = "127.0.0.1", env = "GEOSEED_DB_HOST")]
    pub host: String,

    #[arg(long, global = true, default_value_t = 5432, env = "GEOSEED_DB_PORT")]
    pub port: u16,

    #[arg(long, global = true, default_value = "geo_user", env = "GEOSEED_DB_USER")]
    pub user: String,

    #[arg(long, global = true, default_value = "geo_password", env = "GEOSEED_DB_PASSWORD")]
    pub password: String,

    /// Database name
    #[arg(long, global = true, default_value = "geo_data", env = "GEOSEED_DB_SCHEMA")]
    pub schema: String,

    /// Address table
    #[arg(
        long,
        global = true,
        default_value = "addr_inno",
        env = "GEOSEED_DB_TABLE",
        value_parser = parse_identifier
    )]
    pub table: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Seed the database with feeds and comments for past days.
    Seed(SeedArgs),

    /// Search for addresses near a location.
    #[command(allow_negative_numbers = true)]
    Select {
        /// Longitude in decimal degrees
        lon: f64,
        /// Latitude in decimal degrees
        lat: f64,
        /// Query strategy
        #[arg(long, value_enum)]
        query: QueryType,
        /// Only return addresses closer than this many km
        #[arg(long)]
        within: Option<f64>,
    },

    /// Load addresses from a CSV file.
    Load {
        /// CSV with a LON,LAT,NUMBER,STREET,UNIT,CITY,DISTRICT,REGION,POSTCODE header
        file: PathBuf,
        /// Postal code prefix prepended to every row's postcode
        #[arg(long)]
        postal: Option<String>,
    },

    /// Distance from the reference point to a location, with both formulas.
    #[command(allow_negative_numbers = true)]
    Distance {
        lon: f64,
        lat: f64,
        /// Report miles instead of kilometers
        #[arg(long)]
        miles: bool,
    },

    /// Create the address, feed and comment tables and the distance function.
    Init,
}

/// Options for `seed`.
#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    /// Number of past days to generate, oldest first
    #[arg(long, default_value_t = 7)]
    pub days: u64,

    /// Random seed; a fresh one is drawn and logged when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = 25.0)]
    pub radius_km: f64,

    /// Exclusive upper bound of comments per feed
    #[arg(long, default_value_t = 20)]
    pub max_comments: u32,

    /// Exclusive upper bound of paragraphs per feed
    #[arg(long, default_value_t = 6)]
    pub max_feed_paragraphs: u32,

    /// Exclusive upper bound of paragraphs per comment
    #[arg(long, default_value_t = 3)]
    pub max_comment_paragraphs: u32,

    /// Give up on a feed after this many rejected anchors
    #[arg(long)]
    pub max_anchor_attempts: Option<u32>,

    /// Pick comment authors by walking ids from the feed owner, with this offset budget
    #[arg(long, value_name = "OFFSET")]
    pub walk_commenters: Option<u64>,

    /// Give up on a walk after this many row lookups
    #[arg(long)]
    pub max_walk_lookups: Option<u64>,

    /// Distance formula for walk commenters: law-of-cosines or haversine
    #[arg(long, default_value = "law-of-cosines")]
    pub formula: Formula,

    #[arg(long, env = "GEOSEED_LORIPSUM_URL")]
    pub loripsum_url: Option<String>,
}

impl SeedArgs {
    pub fn generator_config(&self) -> GeneratorConfig {
        let commenters = match self.walk_commenters {
            Some(offset) => CommenterSelection::Walk { offset },
            None => CommenterSelection::Cluster,
        };
        GeneratorConfig {
            radius_km: self.radius_km,
            max_comments: self.max_comments,
            max_feed_paragraphs: self.max_feed_paragraphs,
            max_comment_paragraphs: self.max_comment_paragraphs,
            max_anchor_attempts: self.max_anchor_attempts,
            max_walk_lookups: self.max_walk_lookups,
            commenters,
            formula: self.formula,
            ..GeneratorConfig::default()
        }
    }
}

/// Table names are spliced into SQL, so only plain identifiers are allowed.
fn parse_identifier(s: &str) -> Result<String, String> {
    let mut chars = s.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && s.len() <= 63 {
        Ok(s.to_string())
    } else {
        Err(format!("'{s}' is not a plain SQL identifier"))
    }
}
