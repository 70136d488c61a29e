//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables, plus the request/response bodies built from them.

/// API key authentication model
pub mod api_key;
/// Bank card model
pub mod card;
/// Currency code helpers
pub mod currency;
/// Pagination types
pub mod page;
/// Card-to-card transfer model
pub mod transfer;
