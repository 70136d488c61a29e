//! HTTP middleware components.
//!
//! Middleware run before route handlers. They can authenticate requests
//! and short-circuit the ones that are not allowed through.

/// API key authentication middleware
pub mod auth;
