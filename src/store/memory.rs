//! In-memory ledger for tests.
//!
//! All state sits behind one mutex, so every operation is serialized the
//! same way the PostgreSQL row locks serialize concurrent transfers.
//! Commit and failure-record writes can be made to fail on demand.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use super::{CardStore, TransferFilter, TransferStore};
use crate::{
    error::{AppError, TransferRejection},
    models::{
        card::{Card, CardStatus, NewCard},
        page::{Page, PageRequest},
        transfer::{NewTransfer, Transfer, TransferStatus},
    },
};

#[derive(Default)]
struct State {
    /// Insertion order; newest last
    cards: Vec<Card>,
    transfers: Vec<Transfer>,
    /// Monotonic tick so timestamps never tie
    tick: i64,
}

impl State {
    fn now(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        Utc::now() + Duration::microseconds(self.tick)
    }

    fn card(&self, id: Uuid) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    fn card_mut(&mut self, id: Uuid) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    fn owner_of(&self, card_id: Uuid) -> Option<Uuid> {
        self.card(card_id).map(|c| c.owner_id)
    }

    fn matches(&self, transfer: &Transfer, filter: TransferFilter) -> bool {
        match filter {
            TransferFilter::All => true,
            TransferFilter::Participant(user) => {
                self.owner_of(transfer.from_card_id) == Some(user)
                    || self.owner_of(transfer.to_card_id) == Some(user)
            }
            TransferFilter::Outgoing(user) => self.owner_of(transfer.from_card_id) == Some(user),
            TransferFilter::Incoming(user) => self.owner_of(transfer.to_card_id) == Some(user),
            TransferFilter::Status(status) => transfer.status == status,
            TransferFilter::Period { start, end } => {
                transfer.transfer_date >= start && transfer.transfer_date <= end
            }
        }
    }

    fn insert_transfer(&mut self, transfer: NewTransfer, status: TransferStatus) -> Transfer {
        let transfer_date = self.now();
        let record = Transfer {
            id: Uuid::new_v4(),
            from_card_id: transfer.from_card_id,
            to_card_id: transfer.to_card_id,
            amount: transfer.amount,
            currency: transfer.currency,
            description: transfer.description,
            status,
            transfer_date,
        };
        self.transfers.push(record.clone());
        record
    }
}

/// Newest-first page over `items` (given oldest-first).
fn paginate<T>(mut items: Vec<T>, page: PageRequest) -> Page<T> {
    items.reverse();
    let total = items.len() as i64;
    let content = items
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(page.limit() as usize)
        .collect();
    Page::new(content, page, total)
}

fn storage_failure() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
    fail_commits: AtomicBool,
    fail_failure_records: AtomicBool,
    commit_count: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `commit_transfer` fail with a storage error.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Make every `record_failed_transfer` fail with a storage error.
    pub fn set_fail_failure_records(&self, fail: bool) {
        self.fail_failure_records.store(fail, Ordering::SeqCst);
    }

    /// Number of `commit_transfer` calls, successful or not.
    pub fn commit_count(&self) -> usize {
        self.commit_count.load(Ordering::SeqCst)
    }

    /// Number of transfer rows, whatever their status.
    pub fn transfer_count(&self) -> usize {
        self.state.lock().unwrap().transfers.len()
    }

    /// Insert a card directly, bypassing validation. Test setup only.
    pub fn seed_card(
        &self,
        owner_id: Uuid,
        balance: i64,
        currency: &str,
        status: CardStatus,
        expiration_date: NaiveDate,
    ) -> Card {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let card = Card {
            id: Uuid::new_v4(),
            owner_id,
            card_number: format!("4000{:012}", state.cards.len() + 1),
            holder_name: "TEST HOLDER".to_string(),
            expiration_date,
            status,
            balance,
            currency: currency.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.cards.push(card.clone());
        card
    }

    /// Insert a transfer row with an arbitrary status. Test setup only.
    pub fn seed_transfer(&self, transfer: NewTransfer, status: TransferStatus) -> Transfer {
        self.state.lock().unwrap().insert_transfer(transfer, status)
    }

    pub fn balance_of(&self, card_id: Uuid) -> i64 {
        self.state
            .lock()
            .unwrap()
            .card(card_id)
            .map(|c| c.balance)
            .unwrap_or_default()
    }
}

#[async_trait]
impl CardStore for MemoryLedger {
    async fn find_cards_by_owner(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Card>, AppError> {
        let state = self.state.lock().unwrap();
        let cards = state
            .cards
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(paginate(cards, page))
    }

    async fn find_all_cards(&self, page: PageRequest) -> Result<Page<Card>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(paginate(state.cards.clone(), page))
    }

    async fn find_card_for_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Card>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.card(id).filter(|c| c.owner_id == owner_id).cloned())
    }

    async fn find_card(&self, id: Uuid) -> Result<Option<Card>, AppError> {
        Ok(self.state.lock().unwrap().card(id).cloned())
    }

    async fn card_number_exists(&self, card_number: &str) -> Result<bool, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.cards.iter().any(|c| c.card_number == card_number))
    }

    async fn sum_active_balance(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
    ) -> Result<i64, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .cards
            .iter()
            .filter(|c| {
                c.owner_id == owner_id
                    && c.status == CardStatus::Active
                    && c.expiration_date >= today
            })
            .map(|c| c.balance)
            .sum())
    }

    async fn find_expired_cards(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<Card>, AppError> {
        let state = self.state.lock().unwrap();
        let mut cards: Vec<Card> = state
            .cards
            .iter()
            .filter(|c| c.owner_id == owner_id && c.expiration_date < today)
            .cloned()
            .collect();
        cards.sort_by(|a, b| b.expiration_date.cmp(&a.expiration_date));
        Ok(cards)
    }

    async fn insert_card(&self, card: NewCard) -> Result<Card, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.cards.iter().any(|c| c.card_number == card.card_number) {
            return Err(AppError::Conflict(
                "Card with this number already exists".to_string(),
            ));
        }

        let now = state.now();
        let card = Card {
            id: Uuid::new_v4(),
            owner_id: card.owner_id,
            card_number: card.card_number,
            holder_name: card.holder_name,
            expiration_date: card.expiration_date,
            status: CardStatus::Active,
            balance: card.balance,
            currency: card.currency,
            created_at: now,
            updated_at: now,
        };
        state.cards.push(card.clone());
        Ok(card)
    }

    async fn save_card_status(&self, id: Uuid, status: CardStatus) -> Result<Card, AppError> {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        let card = state.card_mut(id).ok_or(AppError::CardNotFound)?;
        card.status = status;
        card.updated_at = now;
        Ok(card.clone())
    }

    async fn delete_card(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let card = state.card(id).ok_or(AppError::CardNotFound)?;

        if card.balance > 0 {
            return Err(AppError::Conflict(
                "Cannot delete card with positive balance".to_string(),
            ));
        }
        if state
            .transfers
            .iter()
            .any(|t| t.from_card_id == id || t.to_card_id == id)
        {
            return Err(AppError::Conflict(
                "Cannot delete card with transfer history".to_string(),
            ));
        }

        state.cards.retain(|c| c.id != id);
        Ok(())
    }
}

#[async_trait]
impl TransferStore for MemoryLedger {
    async fn find_transfer(&self, id: Uuid) -> Result<Option<Transfer>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.transfers.iter().find(|t| t.id == id).cloned())
    }

    async fn find_transfers(
        &self,
        filter: TransferFilter,
        page: PageRequest,
    ) -> Result<Page<Transfer>, AppError> {
        let state = self.state.lock().unwrap();
        let transfers = state
            .transfers
            .iter()
            .filter(|t| state.matches(t, filter))
            .cloned()
            .collect();
        Ok(paginate(transfers, page))
    }

    async fn sum_outgoing(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .transfers
            .iter()
            .filter(|t| {
                t.status == TransferStatus::Completed
                    && state.matches(t, TransferFilter::Outgoing(user_id))
                    && state.matches(t, TransferFilter::Period { start, end })
            })
            .map(|t| t.amount)
            .sum())
    }

    async fn commit_transfer(&self, transfer: NewTransfer) -> Result<Transfer, AppError> {
        self.commit_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(storage_failure());
        }

        let mut state = self.state.lock().unwrap();

        let from = state
            .card(transfer.from_card_id)
            .ok_or(AppError::CardNotFound)?;
        let to = state
            .card(transfer.to_card_id)
            .ok_or(AppError::CardNotFound)?;

        if from.status != CardStatus::Active {
            return Err(TransferRejection::SourceCardInactive.into());
        }
        if to.status != CardStatus::Active {
            return Err(TransferRejection::DestinationCardInactive.into());
        }
        if from.balance < transfer.amount {
            return Err(TransferRejection::InsufficientFunds.into());
        }
        let credited = to
            .balance
            .checked_add(transfer.amount)
            .ok_or_else(storage_failure)?;

        let now = state.now();
        if let Some(from) = state.card_mut(transfer.from_card_id) {
            from.balance -= transfer.amount;
            from.updated_at = now;
        }
        if let Some(to) = state.card_mut(transfer.to_card_id) {
            to.balance = credited;
            to.updated_at = now;
        }

        Ok(state.insert_transfer(transfer, TransferStatus::Completed))
    }

    async fn record_failed_transfer(&self, transfer: NewTransfer) -> Result<Transfer, AppError> {
        if self.fail_failure_records.load(Ordering::SeqCst) {
            return Err(storage_failure());
        }
        let mut state = self.state.lock().unwrap();
        Ok(state.insert_transfer(transfer, TransferStatus::Failed))
    }

    async fn update_transfer_status(
        &self,
        id: Uuid,
        expected: TransferStatus,
        status: TransferStatus,
    ) -> Result<Option<Transfer>, AppError> {
        let mut state = self.state.lock().unwrap();
        let updated = state
            .transfers
            .iter_mut()
            .find(|t| t.id == id && t.status == expected)
            .map(|t| {
                t.status = status;
                t.clone()
            });
        Ok(updated)
    }
}
