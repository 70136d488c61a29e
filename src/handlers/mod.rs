//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, query string)
//! 2. Checks the caller's role where the route is administrative
//! 3. Delegates to a service over the shared ledger
//! 4. Returns HTTP response (JSON, status code)

/// Ownership and participation checks
pub mod access;
/// Card endpoints
pub mod cards;
/// Health check endpoint
pub mod health;
/// Transfer endpoints
pub mod transfers;
