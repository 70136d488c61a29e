//! Transfer HTTP handlers.
//!
//! This module implements the transfer-related API endpoints:
//! - POST /api/v1/transfers - Execute a transfer from one of the caller's cards
//! - GET /api/v1/transfers/my - Transfers touching the caller's cards
//! - GET /api/v1/transfers/my/outgoing - Transfers the caller sent
//! - GET /api/v1/transfers/my/incoming - Transfers the caller received
//! - GET /api/v1/transfers/my/{id} - One transfer the caller took part in
//! - GET /api/v1/transfers/my/statistics/outgoing - Total sent in a period
//!
//! Administrative:
//! - GET /api/v1/transfers - All transfers
//! - GET /api/v1/transfers/status/{status} - By status
//! - GET /api/v1/transfers/period - By date window
//! - PATCH /api/v1/transfers/{id}/status - Status override
//! - DELETE /api/v1/transfers/{id} - Cancel a pending transfer

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        page::{Page, PageRequest},
        transfer::{
            OutgoingTotalResponse, PeriodQuery, TransferRequest, TransferResponse,
            TransferStatus, UpdateTransferStatusRequest,
        },
    },
    services::transfer_service,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

/// Execute a transfer between two cards.
///
/// # Endpoint
///
/// `POST /api/v1/transfers`
///
/// # Request Body
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
/// # Response
///
/// - **Success (201 Created)**: The COMPLETED transfer
/// - **Error (404)**: Source card not the caller's, or destination missing
/// - **Error (422)**: Validation failed; the `code` names the rule
/// - **Error (500)**: Commit failed; the transfer was recorded as FAILED
///
/// # Atomicity
///
/// Balances and the transfer record are written in one database
/// transaction with both card rows locked.
pub async fn create_transfer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferResponse>), AppError> {
    let transfer = transfer_service::execute_transfer(
        state.ledger.as_ref(),
        &state.policy,
        auth.user_id,
        request,
        Utc::now().date_naive(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(transfer.into())))
}

/// Transfers where the caller owns either card, newest first.
pub async fn list_my_transfers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TransferResponse>>, AppError> {
    let transfers = transfer_service::list_for_user(state.ledger.as_ref(), auth.user_id, page).await?;
    Ok(Json(transfers.map(TransferResponse::from)))
}

pub async fn list_my_outgoing(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TransferResponse>>, AppError> {
    let transfers =
        transfer_service::list_outgoing_for_user(state.ledger.as_ref(), auth.user_id, page).await?;
    Ok(Json(transfers.map(TransferResponse::from)))
}

pub async fn list_my_incoming(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TransferResponse>>, AppError> {
    let transfers =
        transfer_service::list_incoming_for_user(state.ledger.as_ref(), auth.user_id, page).await?;
    Ok(Json(transfers.map(TransferResponse::from)))
}

/// Get a transfer the caller took part in.
///
/// # Response
///
/// - **Success (200 OK)**: Transfer details
/// - **Error (404)**: Transfer not found OR the caller owns neither card
pub async fn get_my_transfer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transfer_id): Path<Uuid>,
) -> Result<Json<TransferResponse>, AppError> {
    let transfer =
        transfer_service::get_transfer(state.ledger.as_ref(), transfer_id, auth.user_id).await?;
    Ok(Json(transfer.into()))
}

/// Total the caller sent in COMPLETED transfers within a window.
///
/// # Endpoint
///
/// `GET /api/v1/transfers/my/statistics/outgoing?start=2025-01-01T00:00:00Z&end=2025-02-01T00:00:00Z`
pub async fn my_outgoing_total(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(period): Query<PeriodQuery>,
) -> Result<Json<OutgoingTotalResponse>, AppError> {
    let total_amount = transfer_service::sum_outgoing_for_period(
        state.ledger.as_ref(),
        auth.user_id,
        period.start,
        period.end,
    )
    .await?;

    Ok(Json(OutgoingTotalResponse {
        total_amount,
        start: period.start,
        end: period.end,
    }))
}

/// List every transfer (admin).
pub async fn list_all_transfers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TransferResponse>>, AppError> {
    auth.require_admin()?;

    let transfers = transfer_service::list_all(state.ledger.as_ref(), page).await?;
    Ok(Json(transfers.map(TransferResponse::from)))
}

/// List transfers in one status (admin).
///
/// `status` is one of `PENDING`, `COMPLETED`, `FAILED`, `CANCELLED`.
pub async fn list_by_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(status): Path<TransferStatus>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TransferResponse>>, AppError> {
    auth.require_admin()?;

    let transfers = transfer_service::list_by_status(state.ledger.as_ref(), status, page).await?;
    Ok(Json(transfers.map(TransferResponse::from)))
}

/// List transfers dated within `[start, end]` (admin).
pub async fn list_by_period(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(period): Query<PeriodQuery>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<TransferResponse>>, AppError> {
    auth.require_admin()?;

    let transfers =
        transfer_service::list_by_period(state.ledger.as_ref(), period.start, period.end, page)
            .await?;
    Ok(Json(transfers.map(TransferResponse::from)))
}

/// Override a transfer's status (admin).
///
/// # Request Body
///
/// ```json
/// { "status": "FAILED" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: The updated transfer
/// - **Error (404)**: Transfer not found
/// - **Error (409)**: Transfer is COMPLETED, or the target is COMPLETED
pub async fn update_transfer_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transfer_id): Path<Uuid>,
    Json(request): Json<UpdateTransferStatusRequest>,
) -> Result<Json<TransferResponse>, AppError> {
    auth.require_admin()?;

    let transfer =
        transfer_service::set_transfer_status(state.ledger.as_ref(), transfer_id, request.status)
            .await?;
    Ok(Json(transfer.into()))
}

/// Cancel a PENDING transfer (admin).
pub async fn cancel_transfer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transfer_id): Path<Uuid>,
) -> Result<Json<TransferResponse>, AppError> {
    auth.require_admin()?;

    let transfer = transfer_service::cancel_transfer(state.ledger.as_ref(), transfer_id).await?;
    Ok(Json(transfer.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{admin, app_state, user};
    use crate::models::card::CardStatus;
    use crate::store::memory::MemoryLedger;
    use axum::response::IntoResponse;
    use chrono::Days;
    use std::sync::Arc;

    #[tokio::test]
    async fn transfer_is_created_for_the_card_owner() {
        let ledger = Arc::new(MemoryLedger::new());
        let alice = Uuid::new_v4();
        let valid = Utc::now().date_naive() + Days::new(30);
        let a = ledger.seed_card(alice, 1_000, "USD", CardStatus::Active, valid);
        let b = ledger.seed_card(Uuid::new_v4(), 500, "USD", CardStatus::Active, valid);
        let request = TransferRequest {
            from_card_id: a.id,
            to_card_id: b.id,
            amount: 300,
            currency: "USD".to_string(),
            description: None,
        };

        let (status, Json(body)) = create_transfer(
            State(app_state(ledger.clone())),
            Extension(user(alice)),
            Json(request),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.status, TransferStatus::Completed);
        assert_eq!(ledger.balance_of(a.id), 700);
        assert_eq!(ledger.balance_of(b.id), 800);
    }

    #[tokio::test]
    async fn rejected_transfer_maps_to_unprocessable_entity() {
        let ledger = Arc::new(MemoryLedger::new());
        let alice = Uuid::new_v4();
        let valid = Utc::now().date_naive() + Days::new(30);
        let a = ledger.seed_card(alice, 1_000, "USD", CardStatus::Active, valid);
        let b = ledger.seed_card(Uuid::new_v4(), 0, "EUR", CardStatus::Active, valid);
        let request = TransferRequest {
            from_card_id: a.id,
            to_card_id: b.id,
            amount: 100,
            currency: "USD".to_string(),
            description: None,
        };

        let err = create_transfer(State(app_state(ledger)), Extension(user(alice)), Json(request))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn admin_listing_requires_admin_role() {
        let ledger = Arc::new(MemoryLedger::new());
        let state = app_state(ledger);

        let err = list_all_transfers(
            State(state.clone()),
            Extension(user(Uuid::new_v4())),
            Query(PageRequest::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let Json(page) = list_all_transfers(State(state), Extension(admin()), Query(PageRequest::default()))
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn inverted_period_is_a_bad_request() {
        let ledger = Arc::new(MemoryLedger::new());
        let now = Utc::now();
        let period = PeriodQuery {
            start: now,
            end: now - chrono::Duration::days(1),
        };

        let err = my_outgoing_total(State(app_state(ledger)), Extension(user(Uuid::new_v4())), Query(period))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
