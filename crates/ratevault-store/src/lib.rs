//! # Ratevault Store
//!
//! SQLite-backed durable store of observed exchange rates.
//!
//! Once a rate for a past date has been observed it never changes, so the
//! store is append-only: rows are inserted with `INSERT OR IGNORE` against
//! a composite primary key and are never updated or deleted. This makes the
//! store a permanent fallback that shields the upstream provider from
//! repeat traffic.

pub mod error;
pub mod models;
pub mod repository;

pub use error::StoreError;
pub use models::StoredRate;
pub use repository::{SqliteRateStore, StoreConfig};
