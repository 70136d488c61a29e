//! Card data models and API request/response types.
//!
//! This module defines:
//! - `Card`: Database entity representing a bank card
//! - `CardStatus`: Persisted administrative status
//! - `EffectiveStatus`: Status as presented to clients (includes Expired)
//! - `CreateCardRequest` / `NewCard`: Card issuing input
//! - `CardResponse`: Response body returned to clients (masked number)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::currency::default_currency;

/// Administrative status stored in the `cards.status` column.
///
/// Expiry is deliberately absent: whether a card is expired is computed
/// from `expiration_date` every time it is read, so it can never drift
/// from the date. See `services::card_lifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "card_status", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum CardStatus {
    Active,
    Blocked,
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardStatus::Active => f.write_str("ACTIVE"),
            CardStatus::Blocked => f.write_str("BLOCKED"),
        }
    }
}

/// Status shown to clients.
///
/// `Expired` wins over the stored status once the expiration date has
/// passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EffectiveStatus {
    Active,
    Blocked,
    Expired,
}

/// Represents a card record from the database.
///
/// # Database Table
///
/// Maps to the `cards` table. Each card:
/// - Belongs to exactly one user (`owner_id`, never changes)
/// - Holds a balance in minor currency units (cents, kopecks, ...)
/// - Has a globally unique card number
///
/// # Balance Storage
///
/// Balances are `i64` minor units. A `CHECK (balance >= 0)` constraint
/// backs up the rule that a card balance is never negative.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Card {
    /// Unique identifier for this card
    pub id: Uuid,

    /// Owning user. Assigned at issue time.
    pub owner_id: Uuid,

    /// Full card number. Only ever leaves the service masked.
    pub card_number: String,

    pub holder_name: String,

    /// Last day on which the card is valid
    pub expiration_date: NaiveDate,

    pub status: CardStatus,

    /// Current balance in minor units
    pub balance: i64,

    /// Currency code (3 uppercase letters). Immutable.
    pub currency: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Request body for issuing a new card (administrators only).
///
/// # JSON Example
///
/// ```json
/// {
///   "owner_id": "550e8400-e29b-41d4-a716-446655440000",
///   "card_number": "4111 1111 1111 1111",
///   "holder_name": "JANE DOE",
///   "expiration_date": "2029-12-31",
///   "currency": "USD",
///   "initial_balance": 0
/// }
/// ```
///
/// # Validation
///
/// - `card_number`: 13 to 19 digits, spaces allowed
/// - `holder_name`: non-empty
/// - `currency`: optional, defaults to "USD"
/// - `initial_balance`: optional, defaults to 0, never negative
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCardRequest {
    pub owner_id: Uuid,

    pub card_number: String,

    pub holder_name: String,

    pub expiration_date: NaiveDate,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub initial_balance: i64,
}

/// A validated card ready to be inserted by a `CardStore`.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub owner_id: Uuid,
    pub card_number: String,
    pub holder_name: String,
    pub expiration_date: NaiveDate,
    pub currency: String,
    pub balance: i64,
}

/// Request body for changing a card's status.
///
/// ```json
/// { "status": "BLOCKED" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCardStatusRequest {
    pub status: CardStatus,
}

/// Response body for card endpoints.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "770e8400-e29b-41d4-a716-446655440002",
///   "owner_id": "550e8400-e29b-41d4-a716-446655440000",
///   "card_number": "**** **** **** 1111",
///   "holder_name": "JANE DOE",
///   "expiration_date": "2029-12-31",
///   "status": "ACTIVE",
///   "balance": 100000,
///   "currency": "USD",
///   "expired": false,
///   "usable": true,
///   "created_at": "2025-12-20T10:00:00Z",
///   "updated_at": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub card_number: String,
    pub holder_name: String,
    pub expiration_date: NaiveDate,
    pub status: EffectiveStatus,
    pub balance: i64,
    pub currency: String,
    pub expired: bool,
    pub usable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CardResponse {
    /// Build a response, deriving expiry relative to `today`.
    pub fn new(card: Card, today: NaiveDate) -> Self {
        use crate::services::card_lifecycle;

        Self {
            expired: card_lifecycle::is_expired(&card, today),
            usable: card_lifecycle::is_usable(&card, today),
            status: card_lifecycle::effective_status(&card, today),
            card_number: mask_card_number(&card.card_number),
            id: card.id,
            owner_id: card.owner_id,
            holder_name: card.holder_name,
            expiration_date: card.expiration_date,
            balance: card.balance,
            currency: card.currency,
            created_at: card.created_at,
            updated_at: card.updated_at,
        }
    }
}

/// Convert database Card to API CardResponse using today's UTC date.
///
/// This transformation masks the card number.
impl From<Card> for CardResponse {
    fn from(card: Card) -> Self {
        Self::new(card, Utc::now().date_naive())
    }
}

/// Total balance response for `GET /api/v1/cards/my/balance`.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub total_balance: i64,
}

/// Mask all but the last four digits.
///
/// `"4111111111111111"` becomes `"**** **** **** 1111"`. Numbers shorter
/// than four digits are fully masked.
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return "****".to_string();
    }
    let last_four: String = digits[digits.len() - 4..].iter().collect();
    format!("**** **** **** {last_four}")
}

/// Strip spaces and dashes from a card number and check its shape.
///
/// Returns `None` unless the result is 13 to 19 ASCII digits.
pub fn normalize_card_number(number: &str) -> Option<String> {
    let digits: String = number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if (13..=19).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}
