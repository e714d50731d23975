//! fixer.io historical rates adapter.
//!
//! Isolates the pipeline from fixer.io's response format: the payload
//! structs and [`adapt`] are the only code that knows the upstream shape,
//! and [`FixerRateSource`] is the only code that talks to the network.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;
use tracing::{debug, info};

use crate::circuit_breaker::CircuitBreaker;
use crate::domain::{RateSnapshot, DATE_FORMAT};
use crate::error::RatesError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::RateProvider;

/// fixer.io error codes that mean the credential itself is the problem:
/// 101 invalid/missing key, 104 monthly usage limit exhausted.
const AUTH_ERROR_CODES: [i64; 2] = [101, 104];

/// Untrusted response shape from the fixer.io historical endpoint. Exists
/// only for the duration of adaptation and is never persisted as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct FixerPayload {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub rates: Option<BTreeMap<String, Decimal>>,
    #[serde(default)]
    pub error: Option<FixerErrorDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixerErrorDetails {
    #[serde(default)]
    pub code: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

/// Converts an upstream payload into a validated snapshot, or the narrowest
/// matching error. Pure: no side effects, never panics on any well-formed
/// payload.
pub fn adapt(payload: FixerPayload) -> Result<RateSnapshot, RatesError> {
    if !payload.success {
        return Err(classify_error(payload.error.as_ref()));
    }

    let base = payload.base.ok_or_else(|| {
        RatesError::Provider(String::from("malformed upstream response: missing base"))
    })?;
    let date_text = payload.date.ok_or_else(|| {
        RatesError::Provider(String::from("malformed upstream response: missing date"))
    })?;
    // The date came from the upstream, not the caller: a parse failure here
    // is a provider defect, not invalid input.
    let date = Date::parse(&date_text, DATE_FORMAT).map_err(|e| {
        RatesError::Provider(format!(
            "malformed upstream response: unparseable date '{date_text}': {e}"
        ))
    })?;

    // Rates are copied verbatim: no unit conversion, no rounding beyond the
    // upstream's own precision.
    Ok(RateSnapshot::new(
        base,
        date,
        payload.rates.unwrap_or_default(),
    ))
}

fn classify_error(error: Option<&FixerErrorDetails>) -> RatesError {
    let Some(details) = error else {
        return RatesError::Provider(String::from(
            "fixer.io reported failure without error details",
        ));
    };

    let info = details
        .info
        .as_deref()
        .or(details.kind.as_deref())
        .unwrap_or("unknown error");

    if AUTH_ERROR_CODES.contains(&details.code) {
        RatesError::Auth(format!("fixer.io authentication failed: {info}"))
    } else {
        RatesError::Provider(format!("fixer.io API error {}: {info}", details.code))
    }
}

/// Connection settings for the fixer.io historical endpoint.
#[derive(Debug, Clone)]
pub struct FixerConfig {
    pub base_url: String,
    pub api_key: String,
    pub base_currency: String,
    pub request_timeout: Duration,
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://data.fixer.io/api"),
            api_key: String::new(),
            base_currency: String::from("EUR"),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Circuit-broken remote fetcher for historical rates.
pub struct FixerRateSource {
    config: FixerConfig,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl FixerRateSource {
    pub fn new(
        config: FixerConfig,
        http_client: Arc<dyn HttpClient>,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            config,
            http_client,
            circuit_breaker,
        }
    }

    fn request_url(&self, date: Date) -> String {
        format!(
            "{}/{date}?access_key={}&base={}",
            self.config.base_url, self.config.api_key, self.config.base_currency
        )
    }

    fn redacted(&self, url: &str) -> String {
        if self.config.api_key.is_empty() {
            return url.to_owned();
        }
        url.replace(&self.config.api_key, "***")
    }

    async fn fetch(&self, date: Date) -> Result<RateSnapshot, RatesError> {
        if !self.circuit_breaker.allow_request() {
            return Err(RatesError::Provider(String::from(
                "circuit open: skipping fixer.io call",
            )));
        }

        let url = self.request_url(date);
        debug!(%date, url = %self.redacted(&url), "calling fixer.io historical endpoint");

        let request = HttpRequest::get(&url).with_timeout(self.config.request_timeout);
        let started = Instant::now();
        let result = self.http_client.execute(request).await;
        let elapsed = started.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(transport) => {
                self.circuit_breaker.record_failure(elapsed);
                return Err(RatesError::Provider(format!(
                    "fixer.io transport error: {}",
                    transport.message()
                )));
            }
        };

        if !response.is_success() {
            self.circuit_breaker.record_failure(elapsed);
            // The error body may still carry a precise classification.
            if let Ok(payload) = serde_json::from_str::<FixerPayload>(&response.body) {
                if !payload.success {
                    return Err(classify_error(payload.error.as_ref()));
                }
            }
            if response.status == 404 {
                return Err(RatesError::NotFound(date.to_string()));
            }
            return Err(RatesError::Provider(format!(
                "fixer.io returned status {}",
                response.status
            )));
        }

        if response.body.trim().is_empty() {
            // The upstream answered but has nothing for this date; that is
            // absence, not a provider failure.
            self.circuit_breaker.record_success(elapsed);
            return Err(RatesError::NotFound(date.to_string()));
        }

        let payload: FixerPayload = match serde_json::from_str(&response.body) {
            Ok(payload) => payload,
            Err(e) => {
                self.circuit_breaker.record_failure(elapsed);
                return Err(RatesError::Provider(format!(
                    "malformed upstream response: {e}"
                )));
            }
        };

        match adapt(payload) {
            Ok(snapshot) if snapshot.is_empty() => {
                self.circuit_breaker.record_success(elapsed);
                Err(RatesError::NotFound(date.to_string()))
            }
            Ok(snapshot) => {
                self.circuit_breaker.record_success(elapsed);
                info!(%date, rates = snapshot.rates.len(), "fetched exchange rates from fixer.io");
                Ok(snapshot)
            }
            Err(error) => {
                self.circuit_breaker.record_failure(elapsed);
                Err(error)
            }
        }
    }
}

impl RateProvider for FixerRateSource {
    fn get_rates<'a>(
        &'a self,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<RateSnapshot, RatesError>> + Send + 'a>> {
        Box::pin(self.fetch(date))
    }
}
