//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//! Stores and services return `AppError` too, so a ledger rule violation
//! reaches the client without any intermediate translation.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use uuid::Uuid;

/// Reason a transfer request was rejected during validation.
///
/// Checked in declaration order; the first failing rule is reported.
/// Nothing is written to the database when a transfer is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferRejection {
    #[error("Cannot transfer to the same card")]
    SameCard,

    #[error("Source card is not active")]
    SourceCardInactive,

    #[error("Destination card is not active")]
    DestinationCardInactive,

    #[error("Amount must be positive")]
    NonPositiveAmount,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Transfer amount exceeds limit of {limit}")]
    AmountExceedsLimit { limit: i64 },

    /// The currency stated in the request differs from the source card's.
    #[error("Source card currency ({card}) doesn't match transfer currency ({requested})")]
    CurrencyMismatch { card: String, requested: String },

    /// The two cards hold different currencies. No conversion is done.
    #[error("Currency mismatch: source card ({from}) and destination card ({to})")]
    CrossCurrency { from: String, to: String },
}

impl TransferRejection {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            TransferRejection::SameCard => "same_card",
            TransferRejection::SourceCardInactive => "source_card_inactive",
            TransferRejection::DestinationCardInactive => "destination_card_inactive",
            TransferRejection::NonPositiveAmount => "non_positive_amount",
            TransferRejection::InsufficientFunds => "insufficient_funds",
            TransferRejection::AmountExceedsLimit { .. } => "amount_exceeds_limit",
            TransferRejection::CurrencyMismatch { .. } => "currency_mismatch",
            TransferRejection::CrossCurrency { .. } => "cross_currency",
        }
    }
}

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Invalid or missing API keys, missing role
/// - **Resource Errors**: Requested card or transfer not found (or not visible)
/// - **Ledger Errors**: Rejected transfers, illegal status changes, conflicts
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// API key is missing, invalid, or inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Authenticated, but the route needs the admin role.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Insufficient permissions")]
    Forbidden,

    /// Card does not exist or is not visible to the caller.
    ///
    /// Returns HTTP 404 Not Found. "Not yours" and "does not exist" are
    /// indistinguishable on purpose.
    #[error("Card not found")]
    CardNotFound,

    /// Transfer does not exist or the caller is not a participant.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Transfer not found")]
    TransferNotFound,

    /// Duplicate card number, or delete of a card that still holds money
    /// or has transfer history.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Transfer failed validation. Nothing was written.
    ///
    /// Returns HTTP 422 Unprocessable Entity with the rejection's code.
    #[error("{0}")]
    InvalidTransfer(#[from] TransferRejection),

    /// Status change not allowed from the current state.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    InvalidTransition(String),

    /// Transfer passed validation but could not be applied.
    ///
    /// The transfer was recorded as FAILED (when that write succeeded)
    /// and both card balances are unchanged.
    /// Returns HTTP 500 Internal Server Error; `reason` is not exposed.
    #[error("Transfer failed: {reason}")]
    TransferFailed {
        transfer_id: Option<Uuid>,
        reason: String,
    },

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "invalid_api_key"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::CardNotFound => (StatusCode::NOT_FOUND, "card_not_found"),
            AppError::TransferNotFound => (StatusCode::NOT_FOUND, "transfer_not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::InvalidTransfer(reason) => (StatusCode::UNPROCESSABLE_ENTITY, reason.code()),
            AppError::InvalidTransition(_) => (StatusCode::CONFLICT, "invalid_transition"),
            AppError::TransferFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "transfer_failed")
            }
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// `transfer_failed` responses also carry `"transfer_id"` when the failed
/// transfer was recorded.
///
/// # Status Code Mapping
///
/// - `InvalidApiKey` → 401 Unauthorized
/// - `Forbidden` → 403 Forbidden
/// - `CardNotFound` / `TransferNotFound` → 404 Not Found
/// - `Conflict` / `InvalidTransition` → 409 Conflict
/// - `InvalidTransfer` → 422 Unprocessable Entity
/// - `InvalidRequest` → 400 Bad Request
/// - `TransferFailed` / `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::Database(_) => "An internal error occurred".to_string(),
            AppError::TransferFailed { .. } => "Transfer could not be completed".to_string(),
            other => other.to_string(),
        };

        // Build JSON response body
        let body = match &self {
            AppError::TransferFailed {
                transfer_id: Some(id),
                ..
            } => json!({
                "error": {
                    "code": code,
                    "message": message,
                    "transfer_id": id
                }
            }),
            _ => json!({
                "error": {
                    "code": code,
                    "message": message
                }
            }),
        };

        // Return the response with status code and JSON body
        (status, Json(body)).into_response()
    }
}
