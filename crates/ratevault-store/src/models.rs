use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};

/// One observed rate: (base, currency, date) plus the rate value.
///
/// The triple is the row's identity; the store's primary key enforces
/// uniqueness, so there is no surrogate id to compare in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRate {
    pub base_currency: String,
    pub currency: String,
    pub date: Date,
    pub rate: Decimal,
    pub created_at: OffsetDateTime,
}

impl StoredRate {
    pub fn new(
        base_currency: impl Into<String>,
        currency: impl Into<String>,
        date: Date,
        rate: Decimal,
    ) -> Self {
        Self {
            base_currency: base_currency.into(),
            currency: currency.into(),
            date,
            rate,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
