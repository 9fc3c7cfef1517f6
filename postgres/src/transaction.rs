//! Draw transaction on `PostgreSQL`.
//!
//! Every counter move is one `UPDATE … WHERE <guard> RETURNING` statement. The
//! row lock taken by the `UPDATE` serialises concurrent draws for the same
//! user; a loser re-evaluates the guard after the winner commits and matches
//! no row.

use crate::rows::{self, from_db_amount, to_db_amount};
use chrono::{DateTime, NaiveDate, Utc};
use spinwheel_core::daily::ClaimLog;
use spinwheel_core::grants::GrantResolver;
use spinwheel_core::ledger::{Deduction, LedgerStore};
use spinwheel_core::settlement::HistoryLog;
use spinwheel_core::store::DrawTransaction;
use spinwheel_core::{
    Balances, DrawError, ForcedWinGrant, FreeSpinGrant, HistoryRecord, Result, UserId,
};
use sqlx::{Postgres, Transaction};

/// An open database transaction.
///
/// Dropping it without [`commit`](DrawTransaction::commit) rolls it back.
pub struct PostgresDrawTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresDrawTransaction {
    pub(crate) const fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }

    async fn credit(&mut self, user_id: UserId, tickets: u64, currency: u64) -> Result<Balances> {
        let row = sqlx::query(
            r"
            INSERT INTO spin_balances (user_id, ticket_balance, currency_balance)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET ticket_balance = spin_balances.ticket_balance + EXCLUDED.ticket_balance,
                currency_balance = spin_balances.currency_balance + EXCLUDED.currency_balance,
                updated_at = NOW()
            RETURNING ticket_balance, currency_balance
            ",
        )
        .bind(user_id.0)
        .bind(to_db_amount(tickets)?)
        .bind(to_db_amount(currency)?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to credit balance: {e}")))?;

        Ok(Balances {
            tickets: from_db_amount(rows::column(&row, "ticket_balance")?)?,
            currency: from_db_amount(rows::column(&row, "currency_balance")?)?,
        })
    }
}

impl LedgerStore for PostgresDrawTransaction {
    async fn try_deduct_tickets(&mut self, user_id: UserId, cost: u64) -> Result<Deduction> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r"
            UPDATE spin_balances
            SET ticket_balance = ticket_balance - $2, updated_at = NOW()
            WHERE user_id = $1 AND ticket_balance >= $2
            RETURNING ticket_balance
            ",
        )
        .bind(user_id.0)
        .bind(to_db_amount(cost)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to deduct tickets: {e}")))?;

        match remaining {
            Some(remaining) => Ok(Deduction::Applied {
                remaining: from_db_amount(remaining)?,
            }),
            // No balance row: zero tickets, so only a free draw passes.
            None if cost == 0 => Ok(Deduction::Applied { remaining: 0 }),
            None => Ok(Deduction::Insufficient),
        }
    }

    async fn credit_currency(&mut self, user_id: UserId, amount: u64) -> Result<Balances> {
        self.credit(user_id, 0, amount).await
    }

    async fn credit_tickets(&mut self, user_id: UserId, amount: u64) -> Result<Balances> {
        self.credit(user_id, amount, 0).await
    }

    async fn balances(&mut self, user_id: UserId) -> Result<Balances> {
        let row = sqlx::query(
            r"
            SELECT ticket_balance, currency_balance
            FROM spin_balances
            WHERE user_id = $1
            ",
        )
        .bind(user_id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to load balances: {e}")))?;

        match row {
            Some(row) => Ok(Balances {
                tickets: from_db_amount(rows::column(&row, "ticket_balance")?)?,
                currency: from_db_amount(rows::column(&row, "currency_balance")?)?,
            }),
            None => Ok(Balances::default()),
        }
    }
}

impl GrantResolver for PostgresDrawTransaction {
    async fn resolve_free_spin(
        &mut self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<FreeSpinGrant>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, spins_remaining, expires_at, created_at
            FROM spin_free_spin_grants
            WHERE user_id = $1
              AND spins_remaining > 0
              AND (expires_at IS NULL OR expires_at > $2)
            ORDER BY expires_at ASC NULLS LAST, created_at ASC, id ASC
            LIMIT 1
            ",
        )
        .bind(user_id.0)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to resolve free spin: {e}")))?;

        row.as_ref().map(rows::free_spin_grant).transpose()
    }

    async fn consume_free_spin(
        &mut self,
        grant: &FreeSpinGrant,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let consumed: Option<i64> = sqlx::query_scalar(
            r"
            UPDATE spin_free_spin_grants
            SET spins_remaining = spins_remaining - 1
            WHERE id = $1
              AND spins_remaining > 0
              AND (expires_at IS NULL OR expires_at > $2)
            RETURNING id
            ",
        )
        .bind(grant.id.0)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to consume free spin: {e}")))?;

        Ok(consumed.is_some())
    }

    async fn resolve_forced_win(
        &mut self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<ForcedWinGrant>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, prize_id, is_active, max_uses, use_count, expires_at, created_at
            FROM spin_forced_wins
            WHERE user_id = $1
              AND is_active
              AND (max_uses IS NULL OR use_count < max_uses)
              AND (expires_at IS NULL OR expires_at > $2)
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(user_id.0)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to resolve forced win: {e}")))?;

        row.as_ref().map(rows::forced_win_grant).transpose()
    }

    async fn consume_forced_win(&mut self, grant: &ForcedWinGrant) -> Result<bool> {
        let consumed: Option<i64> = sqlx::query_scalar(
            r"
            UPDATE spin_forced_wins
            SET use_count = use_count + 1,
                is_active = (max_uses IS NULL OR use_count + 1 < max_uses)
            WHERE id = $1
              AND is_active
              AND (max_uses IS NULL OR use_count < max_uses)
            RETURNING id
            ",
        )
        .bind(grant.id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to consume forced win: {e}")))?;

        Ok(consumed.is_some())
    }
}

impl HistoryLog for PostgresDrawTransaction {
    async fn append_history(&mut self, mut record: HistoryRecord) -> Result<HistoryRecord> {
        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO spin_history (
                user_id, prize_id, prize_name, prize_value, prize_type,
                claim_status, funding, forced, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(record.user_id.0)
        .bind(record.prize_id.0)
        .bind(&record.prize_name)
        .bind(to_db_amount(record.prize_value)?)
        .bind(&record.prize_kind)
        .bind(record.claim_status.as_str())
        .bind(&record.funding)
        .bind(record.forced)
        .bind(record.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to append history: {e}")))?;

        record.id = id;
        Ok(record)
    }
}

impl ClaimLog for PostgresDrawTransaction {
    async fn claim_dates_since(
        &mut self,
        user_id: UserId,
        since: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        sqlx::query_scalar(
            r"
            SELECT claim_date
            FROM spin_daily_claims
            WHERE user_id = $1 AND claim_date >= $2
            ORDER BY claim_date ASC
            ",
        )
        .bind(user_id.0)
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to load daily claims: {e}")))
    }

    async fn record_daily_claim(
        &mut self,
        user_id: UserId,
        date: NaiveDate,
        tickets: u64,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let inserted: Option<NaiveDate> = sqlx::query_scalar(
            r"
            INSERT INTO spin_daily_claims (user_id, claim_date, tickets_granted, claimed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, claim_date) DO NOTHING
            RETURNING claim_date
            ",
        )
        .bind(user_id.0)
        .bind(date)
        .bind(to_db_amount(tickets)?)
        .bind(claimed_at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to record daily claim: {e}")))?;

        Ok(inserted.is_some())
    }
}

impl DrawTransaction for PostgresDrawTransaction {
    async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DrawError::DatabaseError(format!("Failed to commit: {e}")))
    }

    async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DrawError::DatabaseError(format!("Failed to roll back: {e}")))
    }
}
