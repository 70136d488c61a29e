//! Transfer data models and API request/response types.
//!
//! This module defines:
//! - `Transfer`: Database entity representing a card-to-card transfer
//! - `TransferStatus`: Transfer lifecycle states
//! - `TransferRequest` / `NewTransfer`: Input for the transfer engine
//! - `TransferResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transfer lifecycle state.
///
/// - `Pending`: constructed, not yet applied
/// - `Completed`: balances moved; immutable from then on
/// - `Failed`: execution failed after validation; balances untouched
/// - `Cancelled`: cancelled by an administrator while pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transfer_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransferStatus {
    /// Completed, Failed and Cancelled are terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Failed => "FAILED",
            TransferStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Represents a transfer record from the database.
///
/// # Database Table
///
/// Maps to the `transfers` table. Each transfer:
/// - References two distinct cards (foreign keys to `cards.id`)
/// - Stores a strictly positive amount in minor units
/// - Carries the currency shared by both cards
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Transfer {
    pub id: Uuid,

    /// Card that was debited
    pub from_card_id: Uuid,

    /// Card that was credited
    pub to_card_id: Uuid,

    /// Amount in minor units, always > 0
    pub amount: i64,

    pub currency: String,

    pub description: Option<String>,

    pub status: TransferStatus,

    /// Creation time. Never updated.
    pub transfer_date: DateTime<Utc>,
}

/// Request to move money from one card to another.
///
/// # JSON Example
///
/// ```json
/// {
///   "from_card_id": "550e8400-e29b-41d4-a716-446655440000",
///   "to_card_id": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": 25000,
///   "currency": "USD",
///   "description": "Rent"
/// }
/// ```
///
/// The source card must belong to the caller; the destination may belong
/// to anyone.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub from_card_id: Uuid,

    pub to_card_id: Uuid,

    /// Amount in minor units
    pub amount: i64,

    pub currency: String,

    pub description: Option<String>,
}

/// A validated transfer that has not been applied yet (the Pending record).
///
/// Handed to `TransferStore::commit_transfer`, or to
/// `TransferStore::record_failed_transfer` when the commit fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransfer {
    pub from_card_id: Uuid,
    pub to_card_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
}

/// Administrative status override body.
///
/// ```json
/// { "status": "FAILED" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTransferStatusRequest {
    pub status: TransferStatus,
}

/// Inclusive time window, read from `?start=...&end=...`.
///
/// Both bounds are RFC 3339 timestamps.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PeriodQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Response for `GET /api/v1/transfers/my/statistics/outgoing`.
#[derive(Debug, Serialize)]
pub struct OutgoingTotalResponse {
    pub total_amount: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Response returned for transfer operations.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "770e8400-e29b-41d4-a716-446655440002",
///   "from_card_id": "550e8400-e29b-41d4-a716-446655440000",
///   "to_card_id": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": 25000,
///   "currency": "USD",
///   "description": "Rent",
///   "status": "COMPLETED",
///   "transfer_date": "2025-12-21T16:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub id: Uuid,
    pub from_card_id: Uuid,
    pub to_card_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub description: Option<String>,
    pub status: TransferStatus,
    pub transfer_date: DateTime<Utc>,
}

impl From<Transfer> for TransferResponse {
    fn from(transfer: Transfer) -> Self {
        Self {
            id: transfer.id,
            from_card_id: transfer.from_card_id,
            to_card_id: transfer.to_card_id,
            amount: transfer.amount,
            currency: transfer.currency,
            description: transfer.description,
            status: transfer.status,
            transfer_date: transfer.transfer_date,
        }
    }
}
