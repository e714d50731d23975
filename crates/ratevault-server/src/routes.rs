//! HTTP surface: one lookup route plus the error envelope.
//!
//! The core returns domain errors; mapping them onto status codes and a
//! stable JSON error shape happens here and nowhere else.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};

use ratevault_core::{RateSnapshot, RatesError, RatesService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RatesService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/rates/:day", get(get_rates))
        .with_state(state)
}

async fn get_rates(
    State(state): State<AppState>,
    Path(day): Path<String>,
) -> Result<Json<RateSnapshot>, ApiError> {
    info!(%day, "received exchange rate request");
    let snapshot = state.service.get_rates(&day).await?;
    Ok(Json(snapshot))
}

/// Standard error envelope, shared by every failure response.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    timestamp: String,
}

struct ApiError(RatesError);

impl From<RatesError> for ApiError {
    fn from(error: RatesError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, details) = match &self.0 {
            RatesError::InvalidInput(_) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                Some(String::from("Please check the format of your request")),
            ),
            RatesError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "EXCHANGE_RATE_NOT_FOUND",
                Some(String::from(
                    "The requested exchange rates for the given date are not available",
                )),
            ),
            // Both need operator attention or time to recover; clients see
            // the service as unavailable either way.
            RatesError::Auth(_) | RatesError::Provider(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "EXCHANGE_RATE_SERVICE_UNAVAILABLE",
                Some(self.0.to_string()),
            ),
        };

        warn!(code, error = %self.0, "request failed");

        let body = ErrorResponse {
            status: status.as_u16(),
            error: code,
            message: self.0.to_string(),
            details,
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        };

        (status, Json(body)).into_response()
    }
}
