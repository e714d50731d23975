use std::sync::Arc;

use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::domain::{RateSnapshot, DATE_FORMAT};
use crate::error::RatesError;
use crate::provider::RateProvider;

/// Entry point for rate lookups: validates caller input, then delegates to
/// the provider chain. Rejected input never reaches a provider, so it can
/// never pollute circuit breaker statistics.
pub struct RatesService {
    provider: Arc<dyn RateProvider>,
}

impl RatesService {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self { provider }
    }

    pub async fn get_rates(&self, date_text: &str) -> Result<RateSnapshot, RatesError> {
        let date = Date::parse(date_text, DATE_FORMAT).map_err(|_| {
            RatesError::InvalidInput(format!(
                "invalid date format, expected YYYY-MM-DD: '{date_text}'"
            ))
        })?;

        let today = OffsetDateTime::now_utc().date();
        if date > today {
            return Err(RatesError::InvalidInput(format!(
                "cannot retrieve exchange rates for future date: {date}"
            )));
        }

        debug!(%date, "retrieving exchange rates");
        self.provider.get_rates(date).await
    }
}
