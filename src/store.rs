use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::models::{MonitoredLink, PriceObservation, PricePoint};
use crate::utils::error::Result;

/// Append-only price history. Each call is a single statement; no
/// transaction spans an await point.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, observation: &PriceObservation) -> Result<()>;
    async fn max_price(&self) -> Result<Option<PricePoint>>;
    async fn min_price(&self) -> Result<Option<PricePoint>>;
}

/// Durable registry of monitored links, the source of truth the scheduler
/// rebuilds its job set from at startup.
#[async_trait]
pub trait LinkRegistry: Send + Sync {
    /// Idempotent: inserting an already-registered link is a no-op.
    async fn insert(&self, link: &MonitoredLink) -> Result<()>;
    /// Returns whether a row was actually removed.
    async fn delete(&self, url: &str) -> Result<bool>;
    async fn load_all(&self) -> Result<Vec<MonitoredLink>>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect(&config.url)
            .await?;

        let store = Self { pool };
        store.setup().await?;
        Ok(store)
    }

    async fn setup(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_name TEXT NOT NULL,
                old_price INTEGER NOT NULL,
                new_price INTEGER NOT NULL,
                installment_price INTEGER NOT NULL,
                timestamp TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                link TEXT PRIMARY KEY,
                destination TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn extremum(&self, aggregate: &str) -> Result<Option<PricePoint>> {
        let query = format!(
            "SELECT new_price AS price, timestamp FROM prices \
             WHERE new_price = (SELECT {}(new_price) FROM prices) LIMIT 1",
            aggregate
        );

        let point = sqlx::query_as::<_, PricePoint>(&query)
            .fetch_optional(&self.pool)
            .await?;
        Ok(point)
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn append(&self, observation: &PriceObservation) -> Result<()> {
        sqlx::query(
            "INSERT INTO prices (product_name, old_price, new_price, installment_price, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&observation.product_name)
        .bind(observation.old_price)
        .bind(observation.new_price)
        .bind(observation.installment_price)
        .bind(observation.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn max_price(&self) -> Result<Option<PricePoint>> {
        self.extremum("MAX").await
    }

    async fn min_price(&self) -> Result<Option<PricePoint>> {
        self.extremum("MIN").await
    }
}

#[async_trait]
impl LinkRegistry for SqliteStore {
    async fn insert(&self, link: &MonitoredLink) -> Result<()> {
        sqlx::query(
            "INSERT INTO links (link, destination) VALUES (?1, ?2) \
             ON CONFLICT(link) DO NOTHING",
        )
        .bind(&link.link)
        .bind(&link.destination)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE link = ?1")
            .bind(url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_all(&self) -> Result<Vec<MonitoredLink>> {
        let links = sqlx::query_as::<_, MonitoredLink>(
            "SELECT link, destination FROM links ORDER BY link",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }
}
