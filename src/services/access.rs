//! Ownership and participation checks.
//!
//! The predicates come in two layers:
//! - pure functions over already-loaded records (`owns_card`, `participates`)
//! - store-backed wrappers used by handlers (`is_owner`, `is_participant`)
//!
//! The wrappers answer `false` instead of erroring when anything cannot be
//! resolved, so a caller can never tell "missing" from "not yours".

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{card::Card, transfer::Transfer},
    store::{CardStore, Ledger},
};

pub fn owns_card(card: &Card, user_id: Uuid) -> bool {
    card.owner_id == user_id
}

/// True if the user owns the source or the destination card.
pub fn participates(user_id: Uuid, from_card: &Card, to_card: &Card) -> bool {
    owns_card(from_card, user_id) || owns_card(to_card, user_id)
}

/// Load both cards of `transfer` and check participation.
///
/// A card that can no longer be found counts as not owned.
pub async fn participates_in<S: CardStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    transfer: &Transfer,
) -> Result<bool, AppError> {
    let from_card = store.find_card(transfer.from_card_id).await?;
    let to_card = store.find_card(transfer.to_card_id).await?;

    Ok(match (from_card, to_card) {
        (Some(from), Some(to)) => participates(user_id, &from, &to),
        (Some(card), None) | (None, Some(card)) => owns_card(&card, user_id),
        (None, None) => false,
    })
}

/// Does `user_id` own card `card_id`?
pub async fn is_owner<S: CardStore + ?Sized>(store: &S, user_id: Uuid, card_id: Uuid) -> bool {
    match store.find_card(card_id).await {
        Ok(Some(card)) => owns_card(&card, user_id),
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(card_id = %card_id, error = %e, "Ownership check failed");
            false
        }
    }
}

/// Does `user_id` own either card of transfer `transfer_id`?
pub async fn is_participant<S: Ledger + ?Sized>(
    store: &S,
    user_id: Uuid,
    transfer_id: Uuid,
) -> bool {
    let transfer = match store.find_transfer(transfer_id).await {
        Ok(Some(transfer)) => transfer,
        Ok(None) => return false,
        Err(e) => {
            tracing::warn!(transfer_id = %transfer_id, error = %e, "Participation check failed");
            return false;
        }
    };

    match participates_in(store, user_id, &transfer).await {
        Ok(allowed) => allowed,
        Err(e) => {
            tracing::warn!(transfer_id = %transfer_id, error = %e, "Participation check failed");
            false
        }
    }
}
