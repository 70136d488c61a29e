//! Persistence ports for the ledger.
//!
//! Services never talk to sqlx directly; they go through these traits so
//! the transfer rules can be exercised without a running PostgreSQL.
//!
//! - `CardStore`: card records
//! - `TransferStore`: transfer records, plus the atomic commit that moves
//!   money between two cards
//! - `Ledger`: both, as one object handed to services

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        card::{Card, CardStatus, NewCard},
        page::{Page, PageRequest},
        transfer::{NewTransfer, Transfer, TransferStatus},
    },
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgLedger;

/// Which transfers a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFilter {
    /// Every transfer (administrators)
    All,
    /// Transfers where the user owns the source or the destination card
    Participant(Uuid),
    /// Transfers debiting one of the user's cards
    Outgoing(Uuid),
    /// Transfers crediting one of the user's cards
    Incoming(Uuid),
    Status(TransferStatus),
    /// `transfer_date` within `[start, end]`, both inclusive
    Period {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Card persistence operations.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Cards owned by `owner_id`, newest first.
    async fn find_cards_by_owner(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Card>, AppError>;

    /// Every card, newest first.
    async fn find_all_cards(&self, page: PageRequest) -> Result<Page<Card>, AppError>;

    /// Card by id, only if owned by `owner_id`.
    async fn find_card_for_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Card>, AppError>;

    /// Card by id, no ownership check.
    async fn find_card(&self, id: Uuid) -> Result<Option<Card>, AppError>;

    async fn card_number_exists(&self, card_number: &str) -> Result<bool, AppError>;

    /// Sum of balances of the owner's usable cards (active and not expired on `today`).
    async fn sum_active_balance(&self, owner_id: Uuid, today: NaiveDate)
    -> Result<i64, AppError>;

    /// The owner's cards whose expiration date is before `today`.
    async fn find_expired_cards(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<Card>, AppError>;

    /// Insert a card. `Conflict` if the number is already taken.
    async fn insert_card(&self, card: NewCard) -> Result<Card, AppError>;

    /// Persist a new status. `CardNotFound` if the card is gone.
    async fn save_card_status(&self, id: Uuid, status: CardStatus) -> Result<Card, AppError>;

    /// Delete a card.
    ///
    /// `CardNotFound` if absent, `Conflict` if the balance is positive or
    /// the card appears in any transfer. The balance check and the delete
    /// are atomic.
    async fn delete_card(&self, id: Uuid) -> Result<(), AppError>;
}

/// Transfer persistence operations.
#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn find_transfer(&self, id: Uuid) -> Result<Option<Transfer>, AppError>;

    /// Transfers matching `filter`, newest first.
    async fn find_transfers(
        &self,
        filter: TransferFilter,
        page: PageRequest,
    ) -> Result<Page<Transfer>, AppError>;

    /// Total of COMPLETED transfers debiting the user's cards within `[start, end]`.
    async fn sum_outgoing(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, AppError>;

    /// Apply a validated transfer as one atomic unit.
    ///
    /// Locks both cards in ascending id order, re-checks the source
    /// balance under the lock, debits, credits and inserts the transfer as
    /// COMPLETED. Either everything is written or nothing is.
    async fn commit_transfer(&self, transfer: NewTransfer) -> Result<Transfer, AppError>;

    /// Insert the transfer as FAILED without touching any card.
    async fn record_failed_transfer(&self, transfer: NewTransfer) -> Result<Transfer, AppError>;

    /// Set `status` only if the transfer is still in `expected`.
    ///
    /// Returns `None` when the transfer does not exist or its status moved
    /// on since it was read.
    async fn update_transfer_status(
        &self,
        id: Uuid,
        expected: TransferStatus,
        status: TransferStatus,
    ) -> Result<Option<Transfer>, AppError>;
}

/// Combined store handed to services.
pub trait Ledger: CardStore + TransferStore {}

impl<T: CardStore + TransferStore> Ledger for T {}
