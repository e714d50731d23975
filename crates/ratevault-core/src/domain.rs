//! Canonical domain model for exchange rate lookups.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

/// ISO calendar date format (`YYYY-MM-DD`) used for caller input and
/// upstream payload dates alike.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Exchange rates for one calendar date, relative to a fixed base currency.
///
/// `rates` maps currency code to "1 unit of base = rate units of currency",
/// carrying the upstream's own precision verbatim. Immutable once
/// constructed; the cache and the durable store each hold their own
/// materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    #[serde(rename = "base")]
    pub base_currency: String,
    pub date: Date,
    pub rates: BTreeMap<String, Decimal>,
}

impl RateSnapshot {
    pub fn new(
        base_currency: impl Into<String>,
        date: Date,
        rates: BTreeMap<String, Decimal>,
    ) -> Self {
        Self {
            base_currency: base_currency.into(),
            date,
            rates,
        }
    }

    /// A snapshot with zero currencies is absence, not a valid result; the
    /// layer about to return it surfaces `NotFound` instead.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
