//! Business logic services.
//!
//! Services contain the ledger rules, separated from HTTP handlers. They
//! are generic over the store traits so they run against PostgreSQL in
//! production and an in-memory ledger in tests.

pub mod access;
pub mod card_lifecycle;
pub mod card_service;
pub mod transfer_service;
