//! Card service - issuing, lookup, status changes and deletion.
//!
//! Self-service operations are always scoped to the caller's user id.
//! Administrative operations (`get_card`, `list_all_cards`, `create_card`,
//! `set_card_status`, `delete_card`) are not; role checks happen in the
//! handlers before these are called.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        card::{Card, CardStatus, CreateCardRequest, NewCard, normalize_card_number},
        currency::normalize_currency,
        page::{Page, PageRequest},
    },
    services::card_lifecycle,
    store::CardStore,
};

/// The caller's own cards, newest first.
pub async fn list_my_cards<S: CardStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    page: PageRequest,
) -> Result<Page<Card>, AppError> {
    tracing::debug!(user_id = %user_id, "Fetching cards for user");
    store.find_cards_by_owner(user_id, page).await
}

/// Cards of any owner (administrators).
pub async fn list_cards_by_owner<S: CardStore + ?Sized>(
    store: &S,
    owner_id: Uuid,
    page: PageRequest,
) -> Result<Page<Card>, AppError> {
    store.find_cards_by_owner(owner_id, page).await
}

/// Every card (administrators).
pub async fn list_all_cards<S: CardStore + ?Sized>(
    store: &S,
    page: PageRequest,
) -> Result<Page<Card>, AppError> {
    tracing::debug!("Fetching all cards (admin)");
    store.find_all_cards(page).await
}

/// One of the caller's cards.
///
/// # Errors
///
/// - `CardNotFound`: card doesn't exist or belongs to someone else
pub async fn get_my_card<S: CardStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    card_id: Uuid,
) -> Result<Card, AppError> {
    store
        .find_card_for_owner(card_id, user_id)
        .await?
        .ok_or(AppError::CardNotFound)
}

/// Any card by id (administrators).
pub async fn get_card<S: CardStore + ?Sized>(store: &S, card_id: Uuid) -> Result<Card, AppError> {
    store.find_card(card_id).await?.ok_or(AppError::CardNotFound)
}

/// Issue a new card.
///
/// # Process
///
/// 1. Validate and normalize number, holder name, currency, opening balance
/// 2. Reject duplicate card numbers
/// 3. Insert with status ACTIVE
///
/// # Errors
///
/// - `InvalidRequest`: malformed input, or an expiration date already in the past
/// - `Conflict`: card number already issued
pub async fn create_card<S: CardStore + ?Sized>(
    store: &S,
    request: CreateCardRequest,
    today: NaiveDate,
) -> Result<Card, AppError> {
    let card_number = normalize_card_number(&request.card_number).ok_or_else(|| {
        AppError::InvalidRequest("Card number must be 13 to 19 digits".to_string())
    })?;

    let holder_name = request.holder_name.trim().to_string();
    if holder_name.is_empty() || holder_name.chars().count() > 100 {
        return Err(AppError::InvalidRequest(
            "Holder name must be between 1 and 100 characters".to_string(),
        ));
    }

    let currency = normalize_currency(&request.currency).ok_or_else(|| {
        AppError::InvalidRequest("Currency must be a 3-letter code".to_string())
    })?;

    if request.initial_balance < 0 {
        return Err(AppError::InvalidRequest(
            "Initial balance cannot be negative".to_string(),
        ));
    }

    if request.expiration_date < today {
        return Err(AppError::InvalidRequest(
            "Expiration date is in the past".to_string(),
        ));
    }

    if store.card_number_exists(&card_number).await? {
        return Err(AppError::Conflict(
            "Card with this number already exists".to_string(),
        ));
    }

    let card = store
        .insert_card(NewCard {
            owner_id: request.owner_id,
            card_number,
            holder_name,
            expiration_date: request.expiration_date,
            currency,
            balance: request.initial_balance,
        })
        .await?;

    tracing::info!(card_id = %card.id, owner_id = %card.owner_id, "Card created");

    Ok(card)
}

/// Set a card's status (administrators).
///
/// # Errors
///
/// - `CardNotFound`: no such card
/// - `InvalidTransition`: card already has that status
pub async fn set_card_status<S: CardStore + ?Sized>(
    store: &S,
    card_id: Uuid,
    status: CardStatus,
) -> Result<Card, AppError> {
    let mut card = get_card(store, card_id).await?;
    card_lifecycle::set_status(&mut card, status)?;

    let updated = store.save_card_status(card_id, card.status).await?;
    tracing::info!(card_id = %card_id, status = %status, "Card status updated");

    Ok(updated)
}

/// Block one of the caller's own cards.
///
/// Owners may block but never re-activate; activation stays with
/// administrators.
pub async fn block_my_card<S: CardStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    card_id: Uuid,
) -> Result<Card, AppError> {
    let mut card = get_my_card(store, user_id, card_id).await?;
    card_lifecycle::set_status(&mut card, CardStatus::Blocked)?;

    let updated = store.save_card_status(card_id, card.status).await?;
    tracing::info!(card_id = %card_id, user_id = %user_id, "Card blocked by owner");

    Ok(updated)
}

/// The caller's cards whose expiration date has passed.
pub async fn list_expired_cards<S: CardStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<Card>, AppError> {
    store.find_expired_cards(user_id, today).await
}

/// Sum of the caller's usable card balances. 0 when there are none.
pub async fn total_balance<S: CardStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<i64, AppError> {
    store.sum_active_balance(user_id, today).await
}

/// Delete a card (administrators).
///
/// # Errors
///
/// - `CardNotFound`: no such card
/// - `Conflict`: positive balance, or the card has transfer history
pub async fn delete_card<S: CardStore + ?Sized>(store: &S, card_id: Uuid) -> Result<(), AppError> {
    store.delete_card(card_id).await?;
    tracing::info!(card_id = %card_id, "Card deleted");
    Ok(())
}
