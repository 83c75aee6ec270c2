use crate::errors::Result;
use crate::metrics::STORE_QUERY_SECONDS;
use crate::model::EventRow;
use crate::store::{Direction, EventQuery, EventStore};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub async fn make_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    Ok(pool)
}

/// Postgres-backed event table. The table is written by the ingestion
/// side and only read here:
///
/// ```sql
/// CREATE TABLE bowl_events (
///     device_id       TEXT NOT NULL,
///     ts              NUMERIC,
///     detected_object TEXT,
///     photo_url       TEXT
/// );
/// CREATE INDEX ON bowl_events (device_id, ts);
/// ```
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
    table: String,
}

impl PgEventStore {
    /// `table` must already be a validated identifier.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn query(&self, query: &EventQuery) -> Result<Vec<EventRow>> {
        let sql = build_query(&self.table, query);
        debug!("Executing event query: {}", sql);

        let mut query_builder = sqlx::query_as::<_, EventRow>(&sql).bind(&query.device_id);
        if let Some(since) = query.since {
            query_builder = query_builder.bind(since);
        }
        if let Some(limit) = query.limit {
            query_builder = query_builder.bind(limit as i64);
        }

        let start = Instant::now();
        let rows = query_builder.fetch_all(&self.pool).await.map_err(|e| {
            error!("Event query failed for device {}: {}", query.device_id, e);
            e
        })?;
        STORE_QUERY_SECONDS.observe(start.elapsed().as_secs_f64());

        debug!("Fetched {} rows for device {}", rows.len(), query.device_id);
        Ok(rows)
    }
}

fn build_query(table: &str, query: &EventQuery) -> String {
    let mut conditions = vec!["device_id = $1".to_string()];
    let mut next_param = 2;

    if query.since.is_some() {
        conditions.push(format!("ts >= ${}", next_param));
        next_param += 1;
    }

    let order = match query.direction {
        Direction::Ascending => "ASC",
        Direction::Descending => "DESC",
    };

    let limit_clause = if query.limit.is_some() {
        format!(" LIMIT ${}", next_param)
    } else {
        String::new()
    };

    format!(
        "SELECT device_id, ts, detected_object, photo_url FROM {} WHERE {} ORDER BY ts {} NULLS LAST{}",
        table,
        conditions.join(" AND "),
        order,
        limit_clause
    )
}
