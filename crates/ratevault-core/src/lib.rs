//! # Ratevault Core
//!
//! Resilient retrieval pipeline for historical exchange rates.
//!
//! ## Overview
//!
//! A lookup travels through three composed providers, each owning the next:
//!
//! ```text
//! ┌──────────────────┐
//! │  RatesService    │  input validation (date syntax, not-in-future)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  CachedProvider  │  bounded TTL cache, failures never cached
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ StoreBacked      │────▶│ SQLite store     │  permanent fallback,
//! │ Provider         │     │ (ratevault-store)│  write-back on fetch
//! └────────┬─────────┘     └──────────────────┘
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ FixerRateSource  │────▶│ CircuitBreaker   │  windowed failure/slow
//! │ (remote fetch)   │     └──────────────────┘  rates, timed recovery
//! └──────────────────┘
//! ```
//!
//! Repeated or historical requests never hit the rate-limited upstream
//! twice: once a date's rates are observed they are persisted and served
//! from the store forever after.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | fixer.io payload adaptation and remote fetcher |
//! | [`cache`] | Bounded TTL snapshot cache and cache-through decorator |
//! | [`circuit_breaker`] | Windowed circuit breaker for upstream calls |
//! | [`domain`] | Canonical `RateSnapshot` model |
//! | [`error`] | `RatesError` taxonomy |
//! | [`http_client`] | HTTP transport abstraction (reqwest / test doubles) |
//! | [`provider`] | Provider trait, store port, store-backed decorator |
//! | [`service`] | Input-validating lookup service |
//!
//! ## Error Handling
//!
//! Every operation returns `Result<_, RatesError>`; the four kinds separate
//! the caller's fault (`InvalidInput`), legitimate absence (`NotFound`),
//! operator-actionable configuration problems (`Auth`), and retryable
//! provider trouble (`Provider`).

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod provider;
pub mod service;

// Adapter implementation
pub use adapters::fixer::{adapt, FixerConfig, FixerErrorDetails, FixerPayload, FixerRateSource};

// Caching
pub use cache::{CacheConfig, CachedProvider, SnapshotCache};

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

// Domain model
pub use domain::{RateSnapshot, DATE_FORMAT};

// Error taxonomy
pub use error::RatesError;

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

// Provider chain
pub use provider::{RateProvider, RateStore, StoreBackedProvider};

// Lookup service
pub use service::RatesService;

// Durable store (re-exported from ratevault-store)
pub use ratevault_store::{SqliteRateStore, StoreConfig, StoreError, StoredRate};
