//! Card HTTP handlers.
//!
//! Self-service endpoints (any authenticated user, scoped to their cards):
//! - GET /api/v1/cards/my - List own cards
//! - GET /api/v1/cards/my/expired - Own expired cards
//! - GET /api/v1/cards/my/balance - Sum of usable balances
//! - GET /api/v1/cards/my/{id} - Get own card
//! - PATCH /api/v1/cards/my/{id}/block - Block own card
//!
//! Administrative endpoints:
//! - POST /api/v1/cards - Issue a card
//! - GET /api/v1/cards - List all cards
//! - GET /api/v1/cards/{id} - Get any card
//! - GET /api/v1/cards/user/{user_id} - List a user's cards
//! - PATCH /api/v1/cards/{id}/status - Set status
//! - DELETE /api/v1/cards/{id} - Delete a card

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        card::{BalanceResponse, CardResponse, CreateCardRequest, UpdateCardStatusRequest},
        page::{Page, PageRequest},
    },
    services::card_service,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

/// List the caller's cards.
///
/// # Endpoint
///
/// `GET /api/v1/cards/my?page=0&size=20`
///
/// # Response
///
/// - **Success (200 OK)**: Page of cards, newest first, numbers masked
pub async fn list_my_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<CardResponse>>, AppError> {
    let today = Utc::now().date_naive();
    let cards = card_service::list_my_cards(state.ledger.as_ref(), auth.user_id, page).await?;
    Ok(Json(cards.map(|card| CardResponse::new(card, today))))
}

/// The caller's cards whose expiration date has passed.
pub async fn list_my_expired_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<CardResponse>>, AppError> {
    let today = Utc::now().date_naive();
    let cards = card_service::list_expired_cards(state.ledger.as_ref(), auth.user_id, today).await?;
    Ok(Json(
        cards
            .into_iter()
            .map(|card| CardResponse::new(card, today))
            .collect(),
    ))
}

/// Sum of the caller's usable card balances.
///
/// # Response
///
/// ```json
/// { "total_balance": 150000 }
/// ```
pub async fn get_my_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<BalanceResponse>, AppError> {
    let today = Utc::now().date_naive();
    let total_balance = card_service::total_balance(state.ledger.as_ref(), auth.user_id, today).await?;
    Ok(Json(BalanceResponse { total_balance }))
}

/// Get one of the caller's cards.
///
/// # Response
///
/// - **Success (200 OK)**: Card details
/// - **Error (404)**: Card not found OR owned by someone else
pub async fn get_my_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardResponse>, AppError> {
    let card = card_service::get_my_card(state.ledger.as_ref(), auth.user_id, card_id).await?;
    Ok(Json(card.into()))
}

/// Block one of the caller's cards.
///
/// Owners can block but never re-activate; activation is an
/// administrative action.
///
/// # Response
///
/// - **Success (200 OK)**: The blocked card
/// - **Error (404)**: Card not found OR owned by someone else
/// - **Error (409)**: Card is already blocked
pub async fn block_my_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardResponse>, AppError> {
    let card = card_service::block_my_card(state.ledger.as_ref(), auth.user_id, card_id).await?;
    Ok(Json(card.into()))
}

/// Issue a new card (admin).
///
/// # Endpoint
///
/// `POST /api/v1/cards`
///
/// # Request Body
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
/// # Response
///
/// - **Success (201 Created)**: The new card, status ACTIVE
/// - **Error (400)**: Malformed number, holder name, currency, balance or date
/// - **Error (403)**: Caller is not an administrator
/// - **Error (409)**: Card number already issued
pub async fn create_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardResponse>), AppError> {
    auth.require_admin()?;

    let today = Utc::now().date_naive();
    let card = card_service::create_card(state.ledger.as_ref(), request, today).await?;
    Ok((StatusCode::CREATED, Json(CardResponse::new(card, today))))
}

/// List every card (admin).
pub async fn list_all_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<CardResponse>>, AppError> {
    auth.require_admin()?;

    let today = Utc::now().date_naive();
    let cards = card_service::list_all_cards(state.ledger.as_ref(), page).await?;
    Ok(Json(cards.map(|card| CardResponse::new(card, today))))
}

/// Get any card by id (admin).
pub async fn get_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardResponse>, AppError> {
    auth.require_admin()?;

    let card = card_service::get_card(state.ledger.as_ref(), card_id).await?;
    Ok(Json(card.into()))
}

/// List the cards of one user (admin).
pub async fn list_user_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<CardResponse>>, AppError> {
    auth.require_admin()?;

    let today = Utc::now().date_naive();
    let cards = card_service::list_cards_by_owner(state.ledger.as_ref(), user_id, page).await?;
    Ok(Json(cards.map(|card| CardResponse::new(card, today))))
}

/// Set a card's status (admin).
///
/// # Request Body
///
/// ```json
/// { "status": "ACTIVE" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: The updated card
/// - **Error (404)**: Card not found
/// - **Error (409)**: Card already has that status
pub async fn update_card_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
    Json(request): Json<UpdateCardStatusRequest>,
) -> Result<Json<CardResponse>, AppError> {
    auth.require_admin()?;

    let card = card_service::set_card_status(state.ledger.as_ref(), card_id, request.status).await?;
    Ok(Json(card.into()))
}

/// Delete a card (admin).
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (404)**: Card not found
/// - **Error (409)**: Positive balance or transfer history
pub async fn delete_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;

    card_service::delete_card(state.ledger.as_ref(), card_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
