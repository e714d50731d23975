use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use time::{Date, OffsetDateTime};

use super::error::StoreError;
use super::models::StoredRate;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::from("sqlite:ratevault.db"),
            max_connections: 5,
        }
    }
}

/// SQLite-backed durable store of observed exchange rates.
///
/// Rows are never updated or deleted; the composite primary key
/// (base_currency, currency, rate_date) is the final authority on
/// uniqueness, independent of caller discipline.
pub struct SqliteRateStore {
    pool: SqlitePool,
}

impl SqliteRateStore {
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Self::initialize_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// In-memory database for tests. Single connection: every pooled
    /// connection to `sqlite::memory:` would otherwise see its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Self::initialize_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn initialize_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS exchange_rate (
                base_currency TEXT NOT NULL,
                currency TEXT NOT NULL,
                rate_date TEXT NOT NULL,
                rate TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (base_currency, currency, rate_date)
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rate_date ON exchange_rate (rate_date)")
            .execute(pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    /// All rows for (base, date), one per quoted currency.
    pub async fn find_rates(
        &self,
        base_currency: &str,
        date: Date,
    ) -> Result<Vec<StoredRate>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT base_currency, currency, rate_date, rate, created_at
            FROM exchange_rate
            WHERE base_currency = ? AND rate_date = ?
            ORDER BY currency
            "#,
        )
        .bind(base_currency)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.iter().map(row_to_stored_rate).collect()
    }

    /// A single row for the exact (base, currency, date) triple.
    pub async fn find_rate(
        &self,
        base_currency: &str,
        currency: &str,
        date: Date,
    ) -> Result<Option<StoredRate>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT base_currency, currency, rate_date, rate, created_at
            FROM exchange_rate
            WHERE base_currency = ? AND currency = ? AND rate_date = ?
            "#,
        )
        .bind(base_currency)
        .bind(currency)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        row.as_ref().map(row_to_stored_rate).transpose()
    }

    /// Inserts unless the (base, currency, date) triple already exists.
    ///
    /// Returns `true` if a row was written, `false` when a duplicate was
    /// silently skipped. Observed rates for a past date are immutable, so a
    /// duplicate is never an overwrite.
    pub async fn insert_if_absent(&self, rate: &StoredRate) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO exchange_rate
                (base_currency, currency, rate_date, rate, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&rate.base_currency)
        .bind(&rate.currency)
        .bind(rate.date)
        .bind(rate.rate.to_string())
        .bind(rate.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}

fn row_to_stored_rate(row: &sqlx::sqlite::SqliteRow) -> Result<StoredRate, StoreError> {
    let rate_text: String = row
        .try_get("rate")
        .map_err(|e| StoreError::Query(e.to_string()))?;
    // Rates are persisted as canonical decimal text; SQLite has no decimal
    // affinity and REAL would lose the upstream scale.
    let rate = Decimal::from_str(&rate_text)
        .map_err(|e| StoreError::InvalidRow(format!("rate '{rate_text}': {e}")))?;

    Ok(StoredRate {
        base_currency: row
            .try_get("base_currency")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        currency: row
            .try_get("currency")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        date: row
            .try_get::<Date, _>("rate_date")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        rate,
        created_at: row
            .try_get::<OffsetDateTime, _>("created_at")
            .map_err(|e| StoreError::Query(e.to_string()))?,
    })
}
