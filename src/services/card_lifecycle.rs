//! Card lifecycle rules.
//!
//! Pure functions over a `Card` and a calendar date. Nothing here touches
//! the database; callers persist whatever these functions change.
//!
//! A card is **expired** when its expiration date is strictly before
//! today, and **usable** when it is Active and not expired. Expiry is
//! never stored, only derived.

use chrono::NaiveDate;

use crate::{
    error::AppError,
    models::card::{Card, CardStatus, EffectiveStatus},
};

pub fn is_expired(card: &Card, today: NaiveDate) -> bool {
    card.expiration_date < today
}

pub fn is_usable(card: &Card, today: NaiveDate) -> bool {
    card.status == CardStatus::Active && !is_expired(card, today)
}

/// Status as shown to clients: Expired overrides the stored status.
pub fn effective_status(card: &Card, today: NaiveDate) -> EffectiveStatus {
    if is_expired(card, today) {
        return EffectiveStatus::Expired;
    }
    match card.status {
        CardStatus::Active => EffectiveStatus::Active,
        CardStatus::Blocked => EffectiveStatus::Blocked,
    }
}

/// Change the card's status in place.
///
/// # Errors
///
/// - `InvalidTransition`: the card already has `new_status`
pub fn set_status(card: &mut Card, new_status: CardStatus) -> Result<(), AppError> {
    if card.status == new_status {
        return Err(AppError::InvalidTransition(format!(
            "Card already has status: {new_status}"
        )));
    }
    card.status = new_status;
    Ok(())
}
