//! Upstream source adapters.

pub mod fixer;
