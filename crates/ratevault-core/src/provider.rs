use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ratevault_store::{SqliteRateStore, StoreError, StoredRate};
use time::Date;
use tracing::{debug, info, warn};

use crate::domain::RateSnapshot;
use crate::error::RatesError;

/// Capability shared by every layer of the retrieval pipeline: the remote
/// fetcher, the store-backed decorator, and the cache-through decorator all
/// answer the same question. Layers compose by owning the next provider.
pub trait RateProvider: Send + Sync {
    fn get_rates<'a>(
        &'a self,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<RateSnapshot, RatesError>> + Send + 'a>>;
}

/// Durable-store port consumed by [`StoreBackedProvider`]. The store must
/// enforce uniqueness of the (base, currency, date) triple itself; the
/// caller's check-then-write is only a best-effort race guard.
pub trait RateStore: Send + Sync {
    fn find_rates<'a>(
        &'a self,
        base_currency: &'a str,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<StoredRate>, StoreError>> + Send + 'a>>;

    fn find_rate<'a>(
        &'a self,
        base_currency: &'a str,
        currency: &'a str,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<Option<StoredRate>, StoreError>> + Send + 'a>>;

    /// Returns `true` if the row was written, `false` when a duplicate was
    /// silently skipped.
    fn insert_if_absent<'a>(
        &'a self,
        rate: StoredRate,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + 'a>>;
}

impl RateStore for SqliteRateStore {
    fn find_rates<'a>(
        &'a self,
        base_currency: &'a str,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<StoredRate>, StoreError>> + Send + 'a>> {
        Box::pin(SqliteRateStore::find_rates(self, base_currency, date))
    }

    fn find_rate<'a>(
        &'a self,
        base_currency: &'a str,
        currency: &'a str,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<Option<StoredRate>, StoreError>> + Send + 'a>> {
        Box::pin(SqliteRateStore::find_rate(self, base_currency, currency, date))
    }

    fn insert_if_absent<'a>(
        &'a self,
        rate: StoredRate,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + 'a>> {
        Box::pin(async move { SqliteRateStore::insert_if_absent(self, &rate).await })
    }
}

/// Decorates a provider with read-through persistence: rates already in the
/// durable store are served from it without touching the delegate, and
/// freshly fetched rates are written back so the date never has to be
/// fetched from upstream again.
pub struct StoreBackedProvider {
    base_currency: String,
    store: Arc<dyn RateStore>,
    delegate: Arc<dyn RateProvider>,
}

impl StoreBackedProvider {
    pub fn new(
        base_currency: impl Into<String>,
        store: Arc<dyn RateStore>,
        delegate: Arc<dyn RateProvider>,
    ) -> Self {
        Self {
            base_currency: base_currency.into(),
            store,
            delegate,
        }
    }

    async fn get(&self, date: Date) -> Result<RateSnapshot, RatesError> {
        match self.store.find_rates(&self.base_currency, date).await {
            Ok(rows) if !rows.is_empty() => {
                debug!(%date, rows = rows.len(), "durable store hit");
                return Ok(snapshot_from_rows(&self.base_currency, date, rows));
            }
            Ok(_) => debug!(%date, "durable store miss"),
            // Degrade to the delegate: the upstream may still serve a
            // request the store cannot.
            Err(error) => warn!(%date, %error, "durable store read failed, falling through"),
        }

        let snapshot = self.delegate.get_rates(date).await?;
        self.persist(&snapshot).await;
        Ok(snapshot)
    }

    /// Write-back after a confirmed fetch. Failures here must not lose the
    /// fetched rates for the caller, so they are logged and swallowed.
    async fn persist(&self, snapshot: &RateSnapshot) {
        let mut written = 0usize;
        for (currency, rate) in &snapshot.rates {
            match self
                .store
                .find_rate(&snapshot.base_currency, currency, snapshot.date)
                .await
            {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(error) => {
                    warn!(%currency, date = %snapshot.date, %error, "rate lookup before write-back failed");
                    continue;
                }
            }

            let row = StoredRate::new(
                snapshot.base_currency.clone(),
                currency.clone(),
                snapshot.date,
                *rate,
            );
            match self.store.insert_if_absent(row).await {
                // false: a concurrent request won the race; the stored value
                // is identical, so nothing is lost.
                Ok(inserted) => written += usize::from(inserted),
                Err(error) => {
                    warn!(%currency, date = %snapshot.date, %error, "rate write-back failed");
                }
            }
        }
        info!(date = %snapshot.date, written, total = snapshot.rates.len(), "persisted fetched rates");
    }
}

impl RateProvider for StoreBackedProvider {
    fn get_rates<'a>(
        &'a self,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<RateSnapshot, RatesError>> + Send + 'a>> {
        Box::pin(self.get(date))
    }
}

fn snapshot_from_rows(base_currency: &str, date: Date, rows: Vec<StoredRate>) -> RateSnapshot {
    let rates: BTreeMap<String, _> = rows
        .into_iter()
        .map(|row| (row.currency, row.rate))
        .collect();
    RateSnapshot::new(base_currency, date, rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::date;

    #[test]
    fn rows_reconstitute_into_a_single_snapshot() {
        let day = date!(2022 - 06 - 20);
        let rows = vec![
            StoredRate::new("EUR", "USD", day, dec!(1.04)),
            StoredRate::new("EUR", "GBP", day, dec!(0.85)),
        ];

        let snapshot = snapshot_from_rows("EUR", day, rows);

        assert_eq!(snapshot.base_currency, "EUR");
        assert_eq!(snapshot.date, day);
        assert_eq!(snapshot.rates.len(), 2);
        assert_eq!(snapshot.rates["USD"], dec!(1.04));
        assert_eq!(snapshot.rates["GBP"], dec!(0.85));
    }
}
