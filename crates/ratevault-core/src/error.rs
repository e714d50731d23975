use thiserror::Error;

/// Error taxonomy for the rate retrieval pipeline.
///
/// Every component classifies failures into the narrowest applicable kind
/// and propagates them unchanged; `Auth` and `NotFound` are never downgraded
/// to a generic `Provider` error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RatesError {
    /// The caller's fault: malformed date syntax or a date in the future.
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// The date is legitimately outside the data the upstream has.
    #[error("exchange rates not found for date: {0}")]
    NotFound(String),

    /// Upstream credential is invalid, expired, or out of quota. A
    /// configuration problem: retrying will not help until an operator
    /// intervenes.
    #[error("exchange rate provider authentication failed: {0}")]
    Auth(String),

    /// Transient upstream or transport failure, a circuit-open fast-fail,
    /// or a malformed upstream payload. Safe to retry later.
    #[error("exchange rate provider error: {0}")]
    Provider(String),
}

impl RatesError {
    pub const fn retryable(&self) -> bool {
        matches!(self, Self::Provider(_))
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "rates.invalid_input",
            Self::NotFound(_) => "rates.not_found",
            Self::Auth(_) => "rates.auth",
            Self::Provider(_) => "rates.provider",
        }
    }
}
