//! Settlement: apply the winning prize and write the audit record.

use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::types::{Balances, Funding, HistoryRecord, Prize, Reward, UserId};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Append-only draw history.
///
/// There is deliberately no update or delete operation.
pub trait HistoryLog: Send {
    /// Append one record; returns it with its store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn append_history(
        &mut self,
        record: HistoryRecord,
    ) -> impl Future<Output = Result<HistoryRecord>> + Send;
}

/// Balances after settlement plus the record that was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementResult {
    /// Ticket balance after the prize was applied.
    pub remaining_tickets: u64,
    /// Currency balance after the prize was applied.
    pub remaining_currency: u64,
    /// The appended history record.
    pub record: HistoryRecord,
}

/// Applies prize effects to the ledger and records every draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementWriter;

impl SettlementWriter {
    /// Apply `prize` for `user_id` and append exactly one history record.
    ///
    /// Currency and ticket prizes are credited; items and empty outcomes leave
    /// balances alone and are recorded as unclaimed.
    ///
    /// # Errors
    ///
    /// Returns error if a credit or the history append fails. The caller owns
    /// the transaction and must roll it back.
    pub async fn apply_prize<T>(
        &self,
        tx: &mut T,
        user_id: UserId,
        prize: &Prize,
        funding: Funding,
        forced: bool,
        now: DateTime<Utc>,
    ) -> Result<SettlementResult>
    where
        T: LedgerStore + HistoryLog,
    {
        let balances: Balances = match prize.reward {
            Reward::Currency(amount) => tx.credit_currency(user_id, amount).await?,
            Reward::Tickets(count) => tx.credit_tickets(user_id, count).await?,
            Reward::Item(_) | Reward::Nothing => tx.balances(user_id).await?,
        };

        let record = tx
            .append_history(HistoryRecord {
                id: 0,
                user_id,
                prize_id: prize.id,
                prize_name: prize.name.clone(),
                prize_value: prize.reward.value(),
                prize_kind: prize.reward.kind().to_string(),
                claim_status: prize.reward.claim_status(),
                funding: funding.as_str().to_string(),
                forced,
                created_at: now,
            })
            .await?;

        Ok(SettlementResult {
            remaining_tickets: balances.tickets,
            remaining_currency: balances.currency,
            record,
        })
    }
}
