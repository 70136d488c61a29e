//! Shared application state handed to every handler via `State`.

use std::sync::Arc;

use crate::{db::DbPool, services::transfer_service::TransferPolicy, store::Ledger};

#[derive(Clone)]
pub struct AppState {
    /// Raw pool for health checks and API key lookups
    pub pool: DbPool,

    /// Card and transfer persistence
    pub ledger: Arc<dyn Ledger>,

    pub policy: TransferPolicy,
}

impl AppState {
    pub fn new(pool: DbPool, ledger: Arc<dyn Ledger>, policy: TransferPolicy) -> Self {
        Self {
            pool,
            ledger,
            policy,
        }
    }
}
