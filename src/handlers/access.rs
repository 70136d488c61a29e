//! Access check endpoints.
//!
//! - GET /api/v1/access/cards/{id} - Does the caller own this card?
//! - GET /api/v1/access/transfers/{id} - Did the caller take part in this transfer?
//!
//! Both always answer 200 with `{ "allowed": bool }`; a missing record is
//! reported as not allowed.

use crate::{middleware::auth::AuthContext, services::access, state::AppState};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub allowed: bool,
}

pub async fn card_access(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
) -> Json<AccessResponse> {
    let allowed = access::is_owner(state.ledger.as_ref(), auth.user_id, card_id).await;
    Json(AccessResponse { allowed })
}

pub async fn transfer_access(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transfer_id): Path<Uuid>,
) -> Json<AccessResponse> {
    let allowed = access::is_participant(state.ledger.as_ref(), auth.user_id, transfer_id).await;
    Json(AccessResponse { allowed })
}
