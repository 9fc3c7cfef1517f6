//! The draw engine: gate, fund, select, settle.
//!
//! # Flow
//!
//! 1. Load settings (fall back to configured defaults) and refuse when disabled
//! 2. Open a transaction and snapshot the active catalog
//! 3. Resolve a forced-win grant for the user
//! 4. Fund the draw: one free spin if available, otherwise `ticket_cost` tickets
//! 5. Pick the prize: the forced prize if the grant was consumed, otherwise by weight
//! 6. Settle (credit + history record) and commit
//!
//! Any failure after the transaction opened rolls it back, so a draw never
//! charges without also recording its outcome.

use crate::catalog::{CatalogSnapshot, PrizeCatalog};
use crate::config::EngineConfig;
use crate::environment::{Clock, RandomSource};
use crate::error::{DrawError, Result};
use crate::grants::GrantResolver;
use crate::ledger::{Deduction, LedgerStore};
use crate::metrics;
use crate::selection::pick_with_unit;
use crate::settlement::SettlementWriter;
use crate::store::{DrawStore, DrawTransaction, SettingsSource};
use crate::types::{ForcedWinGrant, Funding, Prize, Reward, SpinSettings, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// Outcome of a completed draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawReceipt {
    /// The prize won.
    pub prize: Prize,
    /// Ticket balance after funding and settlement.
    pub remaining_tickets: u64,
    /// Currency balance after settlement.
    pub remaining_currency: u64,
    /// Whether a free-spin grant paid for the draw.
    pub funded_by_grant: bool,
    /// Whether a forced-win grant decided the prize.
    pub forced: bool,
    /// Message for the player.
    pub message: String,
    /// ID of the history record written for this draw.
    pub history_id: i64,
}

/// Player-facing message for a prize.
#[must_use]
pub fn receipt_message(prize: &Prize) -> String {
    match prize.reward {
        Reward::Nothing => "Better luck next time!".to_string(),
        _ => format!("You won {}!", prize.name),
    }
}

/// Orchestrates a single draw end to end.
///
/// Requests for different users proceed independently. Requests for the same
/// user are linearised by the store's conditional updates, not by a lock here.
pub struct DrawEngine<S, R, C> {
    store: S,
    rng: R,
    clock: C,
    config: EngineConfig,
    settlement: SettlementWriter,
}

impl<S, R, C> DrawEngine<S, R, C>
where
    S: DrawStore,
    R: RandomSource,
    C: Clock,
{
    /// Create a new draw engine.
    #[must_use]
    pub const fn new(store: S, rng: R, clock: C, config: EngineConfig) -> Self {
        Self {
            store,
            rng,
            clock,
            config,
            settlement: SettlementWriter,
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Perform one draw for `user_id`.
    ///
    /// # Errors
    ///
    /// - [`DrawError::FeatureDisabled`]: the wheel is switched off
    /// - [`DrawError::InsufficientBalance`]: no free spin and too few tickets
    /// - [`DrawError::NoActivePrizes`]: nothing to draw from; nothing was charged
    /// - Storage errors; the transaction is rolled back
    #[tracing::instrument(skip(self), name = "draw")]
    pub async fn draw(&self, user_id: UserId) -> Result<DrawReceipt> {
        let result = self.run(user_id).await;

        match &result {
            Ok(receipt) => {
                tracing::info!(
                    prize_id = %receipt.prize.id,
                    prize = %receipt.prize.name,
                    funded_by_grant = receipt.funded_by_grant,
                    forced = receipt.forced,
                    remaining_tickets = receipt.remaining_tickets,
                    "Draw completed"
                );
            }
            Err(err) => {
                metrics::record_draw_rejected(err.code());
                match err {
                    DrawError::NoActivePrizes => {
                        tracing::error!("Draw refused: no active prizes configured");
                    }
                    err if err.is_user_error() => {
                        tracing::warn!(reason = err.code(), "Draw refused");
                    }
                    err => tracing::error!(error = %err, "Draw failed"),
                }
            }
        }
        result
    }

    async fn run(&self, user_id: UserId) -> Result<DrawReceipt> {
        let started = Instant::now();
        let settings = self.current_settings().await?;
        if !settings.enabled {
            return Err(DrawError::FeatureDisabled);
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        match self.draw_in(&mut tx, user_id, settings, now).await {
            Ok((receipt, funding)) => {
                tx.commit().await?;
                metrics::record_draw_completed(
                    funding,
                    receipt.prize.reward,
                    receipt.forced,
                    started.elapsed().as_secs_f64(),
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "Failed to roll back draw");
                }
                metrics::record_draw_rolled_back();
                Err(err)
            }
        }
    }

    async fn current_settings(&self) -> Result<SpinSettings> {
        Ok(self
            .store
            .load_settings()
            .await?
            .unwrap_or(self.config.default_settings))
    }

    async fn draw_in(
        &self,
        tx: &mut S::Tx,
        user_id: UserId,
        settings: SpinSettings,
        now: DateTime<Utc>,
    ) -> Result<(DrawReceipt, Funding)> {
        let snapshot = self.store.snapshot_active_prizes().await?;
        let forced = self.resolve_forced(tx, &snapshot, user_id, now).await?;

        // Refuse before charging anything.
        if forced.is_none() && snapshot.is_empty() {
            return Err(DrawError::NoActivePrizes);
        }

        let funding = self.fund(tx, user_id, settings.ticket_cost, now).await?;

        let forced_prize = match forced {
            Some((grant, prize)) => {
                if tx.consume_forced_win(&grant).await? {
                    tracing::info!(
                        grant_id = %grant.id,
                        prize_id = %prize.id,
                        "Forced win applied"
                    );
                    Some(prize)
                } else {
                    tracing::warn!(
                        grant_id = %grant.id,
                        "Forced win exhausted by a concurrent draw; using weighted selection"
                    );
                    None
                }
            }
            None => None,
        };
        let forced_applied = forced_prize.is_some();
        let prize = match forced_prize {
            Some(prize) => prize,
            None => self.pick(&snapshot)?,
        };

        let settled = self
            .settlement
            .apply_prize(tx, user_id, &prize, funding, forced_applied, now)
            .await?;

        let receipt = DrawReceipt {
            message: receipt_message(&prize),
            prize,
            remaining_tickets: settled.remaining_tickets,
            remaining_currency: settled.remaining_currency,
            funded_by_grant: funding.is_grant(),
            forced: forced_applied,
            history_id: settled.record.id,
        };
        Ok((receipt, funding))
    }

    async fn resolve_forced(
        &self,
        tx: &mut S::Tx,
        snapshot: &CatalogSnapshot,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<(ForcedWinGrant, Prize)>> {
        let Some(grant) = tx.resolve_forced_win(user_id, now).await? else {
            return Ok(None);
        };

        let prize = match snapshot.get(grant.prize_id) {
            Some(prize) => Some(prize.clone()),
            None => self.store.find_prize(grant.prize_id).await?,
        };
        match prize {
            Some(prize) => Ok(Some((grant, prize))),
            None => {
                tracing::warn!(
                    grant_id = %grant.id,
                    prize_id = %grant.prize_id,
                    "Forced win references a missing prize; ignoring"
                );
                Ok(None)
            }
        }
    }

    async fn fund(
        &self,
        tx: &mut S::Tx,
        user_id: UserId,
        ticket_cost: u64,
        now: DateTime<Utc>,
    ) -> Result<Funding> {
        if let Some(grant) = tx.resolve_free_spin(user_id, now).await? {
            if tx.consume_free_spin(&grant, now).await? {
                tracing::debug!(grant_id = %grant.id, "Draw funded by free spin");
                return Ok(Funding::FreeSpin { grant_id: grant.id });
            }
            tracing::warn!(
                grant_id = %grant.id,
                "Free spin consumed by a concurrent draw; falling back to tickets"
            );
        }

        match tx.try_deduct_tickets(user_id, ticket_cost).await? {
            Deduction::Applied { remaining } => {
                tracing::debug!(cost = ticket_cost, remaining, "Draw funded by tickets");
                Ok(Funding::Tickets { cost: ticket_cost })
            }
            Deduction::Insufficient => Err(DrawError::InsufficientBalance),
        }
    }

    fn pick(&self, snapshot: &CatalogSnapshot) -> Result<Prize> {
        pick_with_unit(snapshot, self.rng.next_unit())
            .cloned()
            .ok_or(DrawError::NoActivePrizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrizeId;

    fn prize(reward: Reward) -> Prize {
        Prize {
            id: PrizeId(1),
            name: "Jackpot".to_string(),
            reward,
            weight: 1.0,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn message_names_the_prize() {
        assert_eq!(receipt_message(&prize(Reward::Currency(500))), "You won Jackpot!");
        assert_eq!(receipt_message(&prize(Reward::Item(1))), "You won Jackpot!");
    }

    #[test]
    fn nothing_gets_consolation_message() {
        assert_eq!(receipt_message(&prize(Reward::Nothing)), "Better luck next time!");
    }
}
