//! Transfer service - Core business logic for card-to-card transfers.
//!
//! This service handles:
//! - Transfer validation against both cards' lifecycle and balances
//! - Atomic debit/credit with the transfer record
//! - Failure bookkeeping when an atomic commit cannot be applied
//! - Participant-scoped and administrative reads
//! - Administrative status overrides and cancellation
//!
//! # Atomicity Guarantees
//!
//! Validation never writes. Once validation passes, the debit, the credit
//! and the COMPLETED transfer row are written by one
//! `TransferStore::commit_transfer` call. If that call fails the transfer
//! is recorded as FAILED on its own and both balances stay as they were.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, TransferRejection},
    models::{
        card::Card,
        currency::normalize_currency,
        page::{Page, PageRequest},
        transfer::{NewTransfer, Transfer, TransferRequest, TransferStatus},
    },
    services::{access, card_lifecycle},
    store::{Ledger, TransferFilter, TransferStore},
};

/// Longest description stored with a transfer.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Business limits applied to every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    /// Largest single transfer in minor units
    pub max_amount: i64,
}

impl TransferPolicy {
    pub const DEFAULT_MAX_AMOUNT: i64 = 1_000_000;
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            max_amount: Self::DEFAULT_MAX_AMOUNT,
        }
    }
}

/// Check a transfer between two resolved cards.
///
/// Rules run in a fixed order and the first failure is returned:
///
/// 1. source and destination differ
/// 2. source card is usable
/// 3. destination card is usable
/// 4. amount is positive
/// 5. source balance covers the amount
/// 6. amount is within the policy ceiling
/// 7. stated currency equals the source card's currency
/// 8. both cards hold the same currency
pub fn validate_transfer(
    from_card: &Card,
    to_card: &Card,
    amount: i64,
    currency: &str,
    policy: &TransferPolicy,
    today: NaiveDate,
) -> Result<(), TransferRejection> {
    if from_card.id == to_card.id {
        return Err(TransferRejection::SameCard);
    }

    if !card_lifecycle::is_usable(from_card, today) {
        return Err(TransferRejection::SourceCardInactive);
    }

    if !card_lifecycle::is_usable(to_card, today) {
        return Err(TransferRejection::DestinationCardInactive);
    }

    if amount <= 0 {
        return Err(TransferRejection::NonPositiveAmount);
    }

    if from_card.balance < amount {
        return Err(TransferRejection::InsufficientFunds);
    }

    if amount > policy.max_amount {
        return Err(TransferRejection::AmountExceedsLimit {
            limit: policy.max_amount,
        });
    }

    if from_card.currency != currency {
        return Err(TransferRejection::CurrencyMismatch {
            card: from_card.currency.clone(),
            requested: currency.to_string(),
        });
    }

    if from_card.currency != to_card.currency {
        return Err(TransferRejection::CrossCurrency {
            from: from_card.currency.clone(),
            to: to_card.currency.clone(),
        });
    }

    Ok(())
}

/// Execute a transfer on behalf of `requester_id`.
///
/// # Process
///
/// 1. Resolve the source card, scoped to the requester
/// 2. Resolve the destination card by id (any owner)
/// 3. Validate (see `validate_transfer`)
/// 4. Build the pending transfer
/// 5. Commit debit + credit + COMPLETED row atomically
/// 6. On commit failure, record the transfer as FAILED
///
/// # Errors
///
/// - `InvalidRequest`: description too long
/// - `CardNotFound`: source missing or not owned by requester, or destination missing
/// - `InvalidTransfer`: a validation rule failed; nothing was written
/// - `TransferFailed`: commit failed after validation; balances untouched
pub async fn execute_transfer<S: Ledger + ?Sized>(
    store: &S,
    policy: &TransferPolicy,
    requester_id: Uuid,
    request: TransferRequest,
    today: NaiveDate,
) -> Result<Transfer, AppError> {
    let description = request
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(AppError::InvalidRequest(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }

    // "Doesn't exist" and "not yours" are the same answer
    let from_card = store
        .find_card_for_owner(request.from_card_id, requester_id)
        .await?
        .ok_or(AppError::CardNotFound)?;

    let to_card = store
        .find_card(request.to_card_id)
        .await?
        .ok_or(AppError::CardNotFound)?;

    let currency = normalize_currency(&request.currency).unwrap_or(request.currency);

    if let Err(rejection) = validate_transfer(
        &from_card,
        &to_card,
        request.amount,
        &currency,
        policy,
        today,
    ) {
        tracing::warn!(
            requester_id = %requester_id,
            from_card_id = %from_card.id,
            to_card_id = %to_card.id,
            amount = request.amount,
            reason = rejection.code(),
            "Transfer rejected"
        );
        return Err(rejection.into());
    }

    let pending = NewTransfer {
        from_card_id: from_card.id,
        to_card_id: to_card.id,
        amount: request.amount,
        currency,
        description,
    };

    match store.commit_transfer(pending.clone()).await {
        Ok(transfer) => {
            tracing::info!(
                transfer_id = %transfer.id,
                from_card_id = %transfer.from_card_id,
                to_card_id = %transfer.to_card_id,
                amount = transfer.amount,
                currency = %transfer.currency,
                "Transfer completed"
            );
            Ok(transfer)
        }
        Err(commit_error) => {
            tracing::error!(
                from_card_id = %pending.from_card_id,
                to_card_id = %pending.to_card_id,
                amount = pending.amount,
                error = %commit_error,
                "Transfer commit failed"
            );

            let transfer_id = match store.record_failed_transfer(pending).await {
                Ok(failed) => Some(failed.id),
                Err(record_error) => {
                    tracing::error!(error = %record_error, "Could not record failed transfer");
                    None
                }
            };

            Err(AppError::TransferFailed {
                transfer_id,
                reason: commit_error.to_string(),
            })
        }
    }
}

/// A transfer the requester participates in.
///
/// # Errors
///
/// - `TransferNotFound`: no such transfer, or the requester owns neither card
pub async fn get_transfer<S: Ledger + ?Sized>(
    store: &S,
    transfer_id: Uuid,
    requester_id: Uuid,
) -> Result<Transfer, AppError> {
    let transfer = store
        .find_transfer(transfer_id)
        .await?
        .ok_or(AppError::TransferNotFound)?;

    if !access::participates_in(store, requester_id, &transfer).await? {
        return Err(AppError::TransferNotFound);
    }

    Ok(transfer)
}

/// Transfers touching any of the user's cards.
pub async fn list_for_user<S: TransferStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    page: PageRequest,
) -> Result<Page<Transfer>, AppError> {
    store
        .find_transfers(TransferFilter::Participant(user_id), page)
        .await
}

/// Transfers debiting the user's cards.
pub async fn list_outgoing_for_user<S: TransferStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    page: PageRequest,
) -> Result<Page<Transfer>, AppError> {
    store
        .find_transfers(TransferFilter::Outgoing(user_id), page)
        .await
}

/// Transfers crediting the user's cards.
pub async fn list_incoming_for_user<S: TransferStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    page: PageRequest,
) -> Result<Page<Transfer>, AppError> {
    store
        .find_transfers(TransferFilter::Incoming(user_id), page)
        .await
}

pub async fn list_all<S: TransferStore + ?Sized>(
    store: &S,
    page: PageRequest,
) -> Result<Page<Transfer>, AppError> {
    tracing::debug!("Fetching all transfers (admin)");
    store.find_transfers(TransferFilter::All, page).await
}

pub async fn list_by_status<S: TransferStore + ?Sized>(
    store: &S,
    status: TransferStatus,
    page: PageRequest,
) -> Result<Page<Transfer>, AppError> {
    store
        .find_transfers(TransferFilter::Status(status), page)
        .await
}

/// Transfers dated within `[start, end]`.
pub async fn list_by_period<S: TransferStore + ?Sized>(
    store: &S,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    page: PageRequest,
) -> Result<Page<Transfer>, AppError> {
    check_period(start, end)?;
    store
        .find_transfers(TransferFilter::Period { start, end }, page)
        .await
}

/// Total the user sent in COMPLETED transfers within `[start, end]`.
pub async fn sum_outgoing_for_period<S: TransferStore + ?Sized>(
    store: &S,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, AppError> {
    check_period(start, end)?;
    store.sum_outgoing(user_id, start, end).await
}

fn check_period(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if start > end {
        return Err(AppError::InvalidRequest(
            "Period start must not be after its end".to_string(),
        ));
    }
    Ok(())
}

/// Override a transfer's status (administrators).
///
/// Never moves money. A COMPLETED transfer cannot be changed, and no
/// transfer can be moved *into* COMPLETED this way; completion is only
/// reachable through `execute_transfer`.
///
/// # Errors
///
/// - `TransferNotFound`: no such transfer
/// - `InvalidTransition`: completed transfer, target COMPLETED, or the
///   status changed since it was read
pub async fn set_transfer_status<S: TransferStore + ?Sized>(
    store: &S,
    transfer_id: Uuid,
    status: TransferStatus,
) -> Result<Transfer, AppError> {
    let transfer = store
        .find_transfer(transfer_id)
        .await?
        .ok_or(AppError::TransferNotFound)?;

    if transfer.status == TransferStatus::Completed {
        return Err(AppError::InvalidTransition(
            "Cannot modify completed transfer".to_string(),
        ));
    }

    if status == TransferStatus::Completed {
        return Err(AppError::InvalidTransition(
            "Transfers can only be completed by executing them".to_string(),
        ));
    }

    let updated = store
        .update_transfer_status(transfer_id, transfer.status, status)
        .await?
        .ok_or_else(|| {
            AppError::InvalidTransition("Transfer status changed concurrently".to_string())
        })?;

    tracing::info!(
        transfer_id = %transfer_id,
        from = %transfer.status,
        to = %status,
        "Transfer status updated"
    );

    Ok(updated)
}

/// Cancel a PENDING transfer (administrators).
///
/// # Errors
///
/// - `TransferNotFound`: no such transfer
/// - `InvalidTransition`: the transfer is not PENDING
pub async fn cancel_transfer<S: TransferStore + ?Sized>(
    store: &S,
    transfer_id: Uuid,
) -> Result<Transfer, AppError> {
    let transfer = store
        .find_transfer(transfer_id)
        .await?
        .ok_or(AppError::TransferNotFound)?;

    if transfer.status != TransferStatus::Pending {
        return Err(AppError::InvalidTransition(
            "Only pending transfers can be cancelled".to_string(),
        ));
    }

    let cancelled = store
        .update_transfer_status(
            transfer_id,
            TransferStatus::Pending,
            TransferStatus::Cancelled,
        )
        .await?
        .ok_or_else(|| {
            AppError::InvalidTransition("Only pending transfers can be cancelled".to_string())
        })?;

    tracing::info!(transfer_id = %transfer_id, "Transfer cancelled");

    Ok(cancelled)
}
