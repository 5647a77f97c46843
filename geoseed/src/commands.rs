//! Command implementations.

use crate::cli::{Command, DbArgs, SeedArgs};
use crate::load::AddressReader;
use crate::pg::{PgStore, QueryType};
use anyhow::Context;
use geoseed_core::{FeedGenerator, Formula, GeoPoint, Unit};
use loripsum::Loripsum;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Fixed point the `distance` command measures from.
pub const REFERENCE_POINT: GeoPoint = GeoPoint {
    lon: 11.8686483,
    lat: 47.2261598,
};

pub async fn run(command: Command, db: &DbArgs, quiet: bool) -> anyhow::Result<()> {
    match command {
        Command::Seed(args) => seed(db, &args).await,
        Command::Select {
            lon,
            lat,
            query,
            within,
        } => select(db, lon, lat, query, within, quiet).await,
        Command::Load { file, postal } => load(db, &file, postal).await,
        Command::Distance { lon, lat, miles } => {
            let unit = if miles { Unit::Miles } else { Unit::Kilometers };
            let point = GeoPoint::new(lon, lat)?;
            print!("{}", distance_report(&point, unit));
            Ok(())
        }
        Command::Init => {
            let store = PgStore::connect(db).await?;
            store.init_schema().await.context("creating schema")?;
            info!(table = store.table(), "schema ready");
            Ok(())
        }
    }
}

async fn seed(db: &DbArgs, args: &SeedArgs) -> anyhow::Result<()> {
    // Settings are checked before the database is touched.
    let config = args.generator_config();
    config.validate()?;
    let now = chrono::Local::now();
    anyhow::ensure!(
        args.days == 0 || geoseed_core::days_ago(&now, args.days).is_some(),
        "--days {} reaches past the earliest representable date",
        args.days
    );

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, days = args.days, "seeding");
    let mut rng = StdRng::seed_from_u64(seed);

    let content = match &args.loripsum_url {
        Some(url) => Loripsum::with_base_url(url),
        None => Loripsum::new(),
    }
    .context("creating loripsum client")?;

    let store = PgStore::connect(db).await?;
    let generator = FeedGenerator::new(&store, &store, &content, config)?;

    let started = Instant::now();
    let reports = generator
        .seed_days(&mut rng, args.days, &now)
        .await?;

    for report in &reports {
        info!(
            day = report.day,
            start = %report.start,
            feeds = report.feeds,
            comments = report.comments,
            anchor_attempts = report.anchor_attempts,
            first_feed = report.first_feed_id,
            last_feed = report.last_feed_id,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "day seeded"
        );
    }
    info!(
        days = reports.len(),
        feeds = reports.iter().map(|r| r.feeds as u64).sum::<u64>(),
        comments = reports.iter().map(|r| r.comments).sum::<u64>(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        seed,
        "seeding complete"
    );
    Ok(())
}

async fn select(
    db: &DbArgs,
    lon: f64,
    lat: f64,
    query: QueryType,
    within: Option<f64>,
    quiet: bool,
) -> anyhow::Result<()> {
    let point = GeoPoint::new(lon, lat)?;
    if let Some(km) = within {
        anyhow::ensure!(km.is_finite() && km > 0.0, "--within must be a positive number of km");
    }

    let store = PgStore::connect(db).await?;
    let sql = query.sql(store.table(), point, within);
    println!("{sql}");

    let started = Instant::now();
    let rows = store.proximity(&sql).await?;
    let query_time = started.elapsed();

    let started = Instant::now();
    for row in &rows {
        let (id, distance) = PgStore::id_and_distance(row)?;
        if !quiet {
            println!("{id} - {distance:.6}");
        }
    }
    let fetch_time = started.elapsed();

    println!("Query time: {query_time:?}  Fetch time: {fetch_time:?}");
    info!(rows = rows.len(), strategy = ?query, "select complete");
    Ok(())
}

async fn load(db: &DbArgs, file: &Path, postal: Option<String>) -> anyhow::Result<()> {
    let handle = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let mut reader = AddressReader::new(BufReader::new(handle), postal);

    let store = PgStore::connect(db).await?;
    let statement = store.prepare_insert_address().await?;

    let started = Instant::now();
    let mut inserted = 0u64;
    while let Some(address) = reader.next() {
        let address = address.with_context(|| format!("reading {}", file.display()))?;
        store
            .insert_address(&statement, &address)
            .await
            .with_context(|| format!("inserting row {} ({})", reader.rows_read(), address.point))?;
        inserted += 1;
        if inserted % 10_000 == 0 {
            info!(rows = inserted, "loading");
        }
    }

    info!(
        rows = inserted,
        file = %file.display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "load complete"
    );
    Ok(())
}

/// Both formulas' distances from [`REFERENCE_POINT`] to `point`.
pub fn distance_report(point: &GeoPoint, unit: Unit) -> String {
    let suffix = match unit {
        Unit::Kilometers => "km",
        Unit::Miles => "mi",
    };
    [Formula::LawOfCosines, Formula::Haversine]
        .iter()
        .map(|formula| {
            format!(
                "{}: {:.6} {suffix}\n",
                formula.name(),
                formula.distance(&REFERENCE_POINT, point, unit)
            )
        })
        .collect()
}
