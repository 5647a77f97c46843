//! PostgreSQL adapter for the address and feed stores.
//!
//! Addresses live in a configurable table holding the point three ways:
//! degrees, radians and a PostGIS geometry, one per proximity strategy.
//! Feeds and comments go to the fixed `feed` and `comments` tables.

use crate::cli::DbArgs;
use async_trait::async_trait;
use clap::ValueEnum;
use geoseed_core::{
    Address, AddressId, AddressStore, ClusterMember, Comment, Feed, FeedStore, GeoPoint,
    StoreError, EARTH_RADIUS_KM,
};
use tokio_postgres::{Client, NoTls, Row, Statement};
use tracing::{debug, error, info};

const SCHEMA: &str = include_str!("../sql/schema.sql");

const INSERT_FEED: &str = "INSERT INTO feed (id, user_id, slug, category, content, \
     image1, image2, image3, image4, image5, \
     reactions_happy, reactions_love, reactions_funny, reactions_shocked, reactions_sad, reactions_angry, \
     lat, lng, reviewed, date_created) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)";

const INSERT_COMMENT: &str = "INSERT INTO comments (id, parent_id, user_id, content, reviewed, date_created) \
     VALUES ($1, $2, $3, $4, $5, $6)";

/// The DDL for `table` and the feed tables.
pub fn schema_sql(table: &str) -> String {
    SCHEMA.replace("{{table}}", table)
}

/// How `select` computes distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryType {
    /// Law of cosines written out in the query
    Inline,
    /// The `distance_km` stored function
    Stored,
    /// PostGIS sphere distance on the geometry column
    Spatial,
}

impl QueryType {
    /// A query returning `(id, distance_km)` for every address, or only for
    /// those closer than `within_km`.
    pub fn sql(&self, table: &str, point: GeoPoint, within_km: Option<f64>) -> String {
        let lon = format!("{:.7}", point.lon);
        let lat = format!("{:.7}", point.lat);
        let distance = match self {
            QueryType::Inline => format!(
                "{EARTH_RADIUS_KM:.1} * ACOS(LEAST(1.0, GREATEST(-1.0, \
                 COS(RADIANS({lat})) * COS(RADIANS(lat)) * COS(RADIANS(lon) - RADIANS({lon})) \
                 + SIN(RADIANS({lat})) * SIN(RADIANS(lat)))))"
            ),
            QueryType::Stored => format!("distance_km(lon, lat, {lon}, {lat})"),
            QueryType::Spatial => format!(
                "ST_DistanceSphere(geom, ST_SetSRID(ST_MakePoint({lon}, {lat}), 4326)) / 1000.0"
            ),
        };

        let select = format!("SELECT id, {distance} AS distance FROM {table}");
        match within_km {
            Some(km) => format!("SELECT id, distance FROM ({select}) AS d WHERE distance < {km}"),
            None => select,
        }
    }
}

struct Queries {
    row_count: String,
    point_of: String,
    within_radius: String,
    insert_address: String,
}

impl Queries {
    fn new(table: &str) -> Self {
        Self {
            row_count: format!("SELECT COUNT(id) FROM {table}"),
            point_of: format!("SELECT lon, lat FROM {table} WHERE id = $1"),
            within_radius: format!(
                "SELECT id, distance FROM (\
                 SELECT id, {EARTH_RADIUS_KM:.1} * ACOS(LEAST(1.0, GREATEST(-1.0, \
                 COS($2) * COS(rlat) * COS(rlon - $1) + SIN($2) * SIN(rlat)))) AS distance \
                 FROM {table}) AS d WHERE distance <= $3 ORDER BY id"
            ),
            insert_address: format!(
                "INSERT INTO {table} (lon, lat, rlon, rlat, geom, \
                 number, street, unit, city, district, region, postcode) \
                 VALUES ($1, $2, $3, $4, ST_SetSRID(ST_MakePoint($1, $2), 4326), \
                 $5, $6, $7, $8, $9, $10, $11)"
            ),
        }
    }
}

fn query_error(query: &str, e: tokio_postgres::Error) -> StoreError {
    StoreError::Query {
        query: query.to_string(),
        message: e.to_string(),
    }
}

fn write_error(query: &str, e: tokio_postgres::Error) -> StoreError {
    StoreError::Write {
        query: query.to_string(),
        message: e.to_string(),
    }
}

/// Both stores on one PostgreSQL connection.
pub struct PgStore {
    client: Client,
    table: String,
    queries: Queries,
}

impl PgStore {
    pub async fn connect(db: &DbArgs) -> Result<Self, StoreError> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&db.host)
            .port(db.port)
            .user(&db.user)
            .password(&db.password)
            .dbname(&db.schema);

        let (client, connection) = config.connect(NoTls).await.map_err(|e| {
            query_error(
                &format!("connect {}@{}:{}/{}", db.user, db.host, db.port, db.schema),
                e,
            )
        })?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "database connection closed");
            }
        });

        info!(host = %db.host, port = db.port, database = %db.schema, table = %db.table, "connected");
        Ok(Self {
            client,
            table: db.table.clone(),
            queries: Queries::new(&db.table),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the tables and the stored distance function if missing.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let ddl = schema_sql(&self.table);
        self.client
            .batch_execute(&ddl)
            .await
            .map_err(|e| write_error(&ddl, e))
    }

    /// Run a `select` strategy query as-is.
    pub async fn proximity(&self, sql: &str) -> Result<Vec<Row>, StoreError> {
        self.client.query(sql, &[]).await.map_err(|e| query_error(sql, e))
    }

    /// Decode an `(id, distance)` row of a proximity query.
    pub fn id_and_distance(row: &Row) -> Result<(AddressId, f64), StoreError> {
        let decode = |e: tokio_postgres::Error| query_error("decode (id, distance)", e);
        Ok((row.try_get(0).map_err(decode)?, row.try_get(1).map_err(decode)?))
    }

    pub async fn prepare_insert_address(&self) -> Result<Statement, StoreError> {
        let query = &self.queries.insert_address;
        self.client
            .prepare(query)
            .await
            .map_err(|e| query_error(query, e))
    }

    /// Insert one address; its id is assigned by the table.
    pub async fn insert_address(
        &self,
        statement: &Statement,
        address: &Address,
    ) -> Result<(), StoreError> {
        let (rlon, rlat) = address.point.to_radians();
        self.client
            .execute(
                statement,
                &[
                    &address.point.lon,
                    &address.point.lat,
                    &rlon,
                    &rlat,
                    &address.number,
                    &address.street,
                    &address.unit,
                    &address.city,
                    &address.district,
                    &address.region,
                    &address.postcode,
                ],
            )
            .await
            .map_err(|e| write_error(&self.queries.insert_address, e))?;
        Ok(())
    }

    async fn count(&self, query: &str) -> Result<i64, StoreError> {
        let row = self
            .client
            .query_one(query, &[])
            .await
            .map_err(|e| query_error(query, e))?;
        row.try_get(0).map_err(|e| query_error(query, e))
    }
}

#[async_trait]
impl AddressStore for PgStore {
    async fn row_count(&self) -> Result<i64, StoreError> {
        self.count(&self.queries.row_count).await
    }

    async fn point_of(&self, id: AddressId) -> Result<GeoPoint, StoreError> {
        let query = &self.queries.point_of;
        let row = self
            .client
            .query_opt(query, &[&id])
            .await
            .map_err(|e| query_error(query, e))?
            .ok_or_else(|| StoreError::not_found(self.table.as_str(), id))?;

        let lon: f64 = row.try_get(0).map_err(|e| query_error(query, e))?;
        let lat: f64 = row.try_get(1).map_err(|e| query_error(query, e))?;
        Ok(GeoPoint { lon, lat })
    }

    async fn within_radius(
        &self,
        point: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<ClusterMember>, StoreError> {
        let query = &self.queries.within_radius;
        let (rlon, rlat) = point.to_radians();
        let rows = self
            .client
            .query(query, &[&rlon, &rlat, &radius_km])
            .await
            .map_err(|e| query_error(query, e))?;
        debug!(point = %point, radius_km, rows = rows.len(), "radius query");

        rows.iter()
            .map(|row| {
                let (id, distance) = Self::id_and_distance(row)?;
                Ok(ClusterMember::new(id, distance))
            })
            .collect()
    }
}

#[async_trait]
impl FeedStore for PgStore {
    async fn feed_count(&self) -> Result<i64, StoreError> {
        self.count("SELECT COUNT(id) FROM feed").await
    }

    async fn comment_count(&self) -> Result<i64, StoreError> {
        self.count("SELECT COUNT(id) FROM comments").await
    }

    async fn insert_feed(&self, feed: &Feed) -> Result<(), StoreError> {
        let r = &feed.reactions;
        let reactions: [i32; 6] = [r.happy, r.love, r.funny, r.shocked, r.sad, r.angry]
            .map(|count| i32::try_from(count).unwrap_or(i32::MAX));
        let images: [&str; 5] = [0, 1, 2, 3, 4].map(|i| feed.image(i));

        self.client
            .execute(
                INSERT_FEED,
                &[
                    &feed.id,
                    &feed.user_id,
                    &feed.slug,
                    &feed.category,
                    &feed.content,
                    &images[0],
                    &images[1],
                    &images[2],
                    &images[3],
                    &images[4],
                    &reactions[0],
                    &reactions[1],
                    &reactions[2],
                    &reactions[3],
                    &reactions[4],
                    &reactions[5],
                    &feed.point.lat,
                    &feed.point.lon,
                    &feed.reviewed,
                    &feed.created_at,
                ],
            )
            .await
            .map_err(|e| write_error(INSERT_FEED, e))?;
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        self.client
            .execute(
                INSERT_COMMENT,
                &[
                    &comment.id,
                    &comment.parent_id,
                    &comment.user_id,
                    &comment.content,
                    &comment.reviewed,
                    &comment.created_at,
                ],
            )
            .await
            .map_err(|e| write_error(INSERT_COMMENT, e))?;
        Ok(())
    }
}
