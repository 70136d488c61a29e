//! PostgreSQL ledger store.
//!
//! # Atomicity Guarantees
//!
//! Every multi-row mutation runs inside one PostgreSQL transaction.
//! Card rows touched by a transfer are locked with `SELECT ... FOR UPDATE`
//! in ascending id order, so two transfers moving money in opposite
//! directions between the same cards queue up instead of deadlocking.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{CardStore, TransferFilter, TransferStore};
use crate::{
    db::DbPool,
    error::{AppError, TransferRejection},
    models::{
        card::{Card, CardStatus, NewCard},
        page::{Page, PageRequest},
        transfer::{NewTransfer, Transfer, TransferStatus},
    },
};

/// Ledger backed by the `cards` and `transfers` tables.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: DbPool,
}

impl PgLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// `(LIMIT, OFFSET)` for a page request.
fn limit_offset(page: PageRequest) -> (i64, i64) {
    (
        i64::from(page.limit()),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

/// Translate constraint violations into `Conflict`, pass everything else through.
fn map_constraint_violation(err: sqlx::Error, conflict_message: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
            return AppError::Conflict(conflict_message.to_string());
        }
    }
    AppError::Database(err)
}

/// Append the WHERE clause for `filter`.
fn push_transfer_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: TransferFilter) {
    match filter {
        TransferFilter::All => {}
        TransferFilter::Participant(user_id) => {
            qb.push(" WHERE from_card_id IN (SELECT id FROM cards WHERE owner_id = ")
                .push_bind(user_id)
                .push(") OR to_card_id IN (SELECT id FROM cards WHERE owner_id = ")
                .push_bind(user_id)
                .push(")");
        }
        TransferFilter::Outgoing(user_id) => {
            qb.push(" WHERE from_card_id IN (SELECT id FROM cards WHERE owner_id = ")
                .push_bind(user_id)
                .push(")");
        }
        TransferFilter::Incoming(user_id) => {
            qb.push(" WHERE to_card_id IN (SELECT id FROM cards WHERE owner_id = ")
                .push_bind(user_id)
                .push(")");
        }
        TransferFilter::Status(status) => {
            qb.push(" WHERE status = ").push_bind(status);
        }
        TransferFilter::Period { start, end } => {
            qb.push(" WHERE transfer_date BETWEEN ")
                .push_bind(start)
                .push(" AND ")
                .push_bind(end);
        }
    }
}

#[async_trait]
impl CardStore for PgLedger {
    async fn find_cards_by_owner(
        &self,
        owner_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Card>, AppError> {
        let (limit, offset) = limit_offset(page);

        let cards = sqlx::query_as::<_, Card>(
            r#"
            SELECT * FROM cards
            WHERE owner_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(cards, page, total))
    }

    async fn find_all_cards(&self, page: PageRequest) -> Result<Page<Card>, AppError> {
        let (limit, offset) = limit_offset(page);

        let cards = sqlx::query_as::<_, Card>(
            "SELECT * FROM cards ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards")
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(cards, page, total))
    }

    async fn find_card_for_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Card>, AppError> {
        // Filter by BOTH id AND owner so foreign cards look absent
        let card = sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(card)
    }

    async fn find_card(&self, id: Uuid) -> Result<Option<Card>, AppError> {
        let card = sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(card)
    }

    async fn card_number_exists(&self, card_number: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cards WHERE card_number = $1)")
                .bind(card_number)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn sum_active_balance(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
    ) -> Result<i64, AppError> {
        // SUM(BIGINT) is NUMERIC in PostgreSQL, cast back
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(balance), 0)::BIGINT
            FROM cards
            WHERE owner_id = $1
              AND status = 'active'
              AND expiration_date >= $2
            "#,
        )
        .bind(owner_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn find_expired_cards(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<Card>, AppError> {
        let cards = sqlx::query_as::<_, Card>(
            r#"
            SELECT * FROM cards
            WHERE owner_id = $1 AND expiration_date < $2
            ORDER BY expiration_date DESC, id
            "#,
        )
        .bind(owner_id)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    async fn insert_card(&self, card: NewCard) -> Result<Card, AppError> {
        sqlx::query_as::<_, Card>(
            r#"
            INSERT INTO cards (owner_id, card_number, holder_name, expiration_date, currency, balance)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(card.owner_id)
        .bind(card.card_number)
        .bind(card.holder_name)
        .bind(card.expiration_date)
        .bind(card.currency)
        .bind(card.balance)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint_violation(e, "Card with this number already exists"))
    }

    async fn save_card_status(&self, id: Uuid, status: CardStatus) -> Result<Card, AppError> {
        sqlx::query_as::<_, Card>(
            "UPDATE cards SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::CardNotFound)
    }

    async fn delete_card(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock the card so no transfer can credit it between the check and the delete
        let balance: i64 = sqlx::query_scalar("SELECT balance FROM cards WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::CardNotFound)?;

        if balance > 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict(
                "Cannot delete card with positive balance".to_string(),
            ));
        }

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM transfers WHERE from_card_id = $1 OR to_card_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced {
            tx.rollback().await?;
            return Err(AppError::Conflict(
                "Cannot delete card with transfer history".to_string(),
            ));
        }

        sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_constraint_violation(e, "Cannot delete card with transfer history"))?;

        tx.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl TransferStore for PgLedger {
    async fn find_transfer(&self, id: Uuid) -> Result<Option<Transfer>, AppError> {
        let transfer = sqlx::query_as::<_, Transfer>("SELECT * FROM transfers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(transfer)
    }

    async fn find_transfers(
        &self,
        filter: TransferFilter,
        page: PageRequest,
    ) -> Result<Page<Transfer>, AppError> {
        let (limit, offset) = limit_offset(page);

        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM transfers");
        push_transfer_filter(&mut query, filter);
        query
            .push(" ORDER BY transfer_date DESC, id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let transfers = query
            .build_query_as::<Transfer>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transfers");
        push_transfer_filter(&mut count, filter);

        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(Page::new(transfers, page, total))
    }

    async fn sum_outgoing(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(t.amount), 0)::BIGINT
            FROM transfers t
            JOIN cards c ON c.id = t.from_card_id
            WHERE c.owner_id = $1
              AND t.status = 'completed'
              AND t.transfer_date BETWEEN $2 AND $3
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn commit_transfer(&self, transfer: NewTransfer) -> Result<Transfer, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock both cards, lowest id first
        let locked: Vec<(Uuid, i64, CardStatus)> = sqlx::query_as(
            "SELECT id, balance, status FROM cards WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(vec![transfer.from_card_id, transfer.to_card_id])
        .fetch_all(&mut *tx)
        .await?;

        if locked.len() != 2 {
            tx.rollback().await?;
            return Err(AppError::CardNotFound);
        }

        // Balances may have moved since validation read them
        for (id, balance, status) in &locked {
            if *status != CardStatus::Active {
                tx.rollback().await?;
                return Err(if *id == transfer.from_card_id {
                    TransferRejection::SourceCardInactive.into()
                } else {
                    TransferRejection::DestinationCardInactive.into()
                });
            }
            if *id == transfer.from_card_id && *balance < transfer.amount {
                tx.rollback().await?;
                return Err(TransferRejection::InsufficientFunds.into());
            }
        }

        sqlx::query(
            "UPDATE cards SET balance = balance - $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(transfer.amount)
        .bind(transfer.from_card_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE cards SET balance = balance + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(transfer.amount)
        .bind(transfer.to_card_id)
        .execute(&mut *tx)
        .await?;

        let committed = sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (from_card_id, to_card_id, amount, currency, description, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(transfer.from_card_id)
        .bind(transfer.to_card_id)
        .bind(transfer.amount)
        .bind(transfer.currency)
        .bind(transfer.description)
        .bind(TransferStatus::Completed)
        .fetch_one(&mut *tx)
        .await?;

        // Commit ALL changes atomically
        // If this fails, everything rolls back
        tx.commit().await?;

        Ok(committed)
    }

    async fn record_failed_transfer(&self, transfer: NewTransfer) -> Result<Transfer, AppError> {
        let failed = sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (from_card_id, to_card_id, amount, currency, description, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(transfer.from_card_id)
        .bind(transfer.to_card_id)
        .bind(transfer.amount)
        .bind(transfer.currency)
        .bind(transfer.description)
        .bind(TransferStatus::Failed)
        .fetch_one(&self.pool)
        .await?;

        Ok(failed)
    }

    async fn update_transfer_status(
        &self,
        id: Uuid,
        expected: TransferStatus,
        status: TransferStatus,
    ) -> Result<Option<Transfer>, AppError> {
        let updated = sqlx::query_as::<_, Transfer>(
            "UPDATE transfers SET status = $1 WHERE id = $2 AND status = $3 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }
}
