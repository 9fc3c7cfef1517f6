//! Daily bonus claims.
//!
//! Once per UTC day a user may claim bonus tickets. The amount grows with the
//! number of consecutive days claimed. Uniqueness of a day's claim is enforced
//! by a conditional insert in storage, never by a process-local flag.

use crate::config::{DailyClaimConfig, EngineConfig};
use crate::environment::Clock;
use crate::error::{DrawError, Result};
use crate::ledger::LedgerStore;
use crate::metrics;
use crate::store::{DrawStore, DrawTransaction};
use crate::types::UserId;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;

/// Per-user daily claim log.
pub trait ClaimLog: Send {
    /// Dates on or after `since` for which `user_id` has a claim.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn claim_dates_since(
        &mut self,
        user_id: UserId,
        since: NaiveDate,
    ) -> impl Future<Output = Result<Vec<NaiveDate>>> + Send;

    /// Record a claim for `date` unless one already exists.
    ///
    /// Returns `false` when the user already claimed on `date`.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn record_daily_claim(
        &mut self,
        user_id: UserId,
        date: NaiveDate,
        tickets: u64,
        claimed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Number of consecutive claimed days ending on `end`, walking backwards.
///
/// Returns 0 when `end` itself was not claimed.
#[must_use]
pub fn streak_ending(claims: &[NaiveDate], end: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = claims.iter().copied().collect();
    let mut streak = 0;
    let mut day = end;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

/// Result of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyClaimReceipt {
    /// Tickets credited by this claim.
    pub tickets_granted: u64,
    /// Streak length including today.
    pub streak: u32,
    /// Ticket balance after the credit.
    pub ticket_balance: u64,
    /// Start of the next UTC day.
    pub next_claim_at: DateTime<Utc>,
}

/// Claim state for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyClaimStatus {
    /// Whether a claim would succeed now.
    pub can_claim: bool,
    /// Whether today's claim was already made.
    pub claimed_today: bool,
    /// Streak ending today (if claimed) or yesterday.
    pub current_streak: u32,
    /// Tickets the next claim would grant.
    pub next_claim_tickets: u64,
    /// When the next claim becomes possible.
    pub next_claim_at: DateTime<Utc>,
}

/// Daily bonus service.
pub struct DailyClaimService<S, C> {
    store: S,
    clock: C,
    config: DailyClaimConfig,
}

impl<S, C> DailyClaimService<S, C>
where
    S: DrawStore,
    C: Clock,
{
    /// Create a daily claim service using `config.daily_claim`.
    #[must_use]
    pub fn new(store: S, clock: C, config: &EngineConfig) -> Self {
        Self {
            store,
            clock,
            config: config.daily_claim.clone(),
        }
    }

    /// Claim today's bonus.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::AlreadyClaimed`] when today's claim exists, or a
    /// storage error. Nothing is credited on error.
    #[tracing::instrument(skip(self), name = "daily_claim")]
    pub async fn claim(&self, user_id: UserId) -> Result<DailyClaimReceipt> {
        let now = self.clock.now();
        let today = now.date_naive();
        let mut tx = self.store.begin().await?;

        match self.claim_in(&mut tx, user_id, now, today).await {
            Ok(receipt) => {
                tx.commit().await?;
                metrics::record_daily_claim(receipt.tickets_granted);
                tracing::info!(
                    tickets = receipt.tickets_granted,
                    streak = receipt.streak,
                    "Daily bonus claimed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "Failed to roll back daily claim");
                }
                if err == DrawError::AlreadyClaimed {
                    tracing::debug!("Daily bonus already claimed");
                } else {
                    tracing::warn!(error = %err, "Daily claim failed");
                }
                Err(err)
            }
        }
    }

    async fn claim_in(
        &self,
        tx: &mut S::Tx,
        user_id: UserId,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> Result<DailyClaimReceipt> {
        let dates = tx.claim_dates_since(user_id, self.window_start(today)).await?;
        if dates.contains(&today) {
            return Err(DrawError::AlreadyClaimed);
        }

        let streak = today.pred_opt().map_or(0, |yesterday| streak_ending(&dates, yesterday)) + 1;
        let tickets = self.config.tickets_for_streak(streak);

        if !tx.record_daily_claim(user_id, today, tickets, now).await? {
            return Err(DrawError::AlreadyClaimed);
        }
        let balances = tx.credit_tickets(user_id, tickets).await?;

        Ok(DailyClaimReceipt {
            tickets_granted: tickets,
            streak,
            ticket_balance: balances.tickets,
            next_claim_at: next_day_start(today)?,
        })
    }

    /// Current claim state for `user_id`. Read-only.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    pub async fn status(&self, user_id: UserId) -> Result<DailyClaimStatus> {
        let today = self.clock.now().date_naive();
        let mut tx = self.store.begin().await?;
        let dates = tx.claim_dates_since(user_id, self.window_start(today)).await;
        tx.rollback().await?;
        let dates = dates?;

        let claimed_today = dates.contains(&today);
        let current_streak = if claimed_today {
            streak_ending(&dates, today)
        } else {
            today.pred_opt().map_or(0, |yesterday| streak_ending(&dates, yesterday))
        };

        Ok(DailyClaimStatus {
            can_claim: !claimed_today,
            claimed_today,
            current_streak,
            next_claim_tickets: self.config.tickets_for_streak(current_streak + 1),
            next_claim_at: if claimed_today {
                next_day_start(today)?
            } else {
                day_start(today)?
            },
        })
    }

    fn window_start(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.config.lookback_days)))
            .unwrap_or(NaiveDate::MIN)
    }
}

fn day_start(day: NaiveDate) -> Result<DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or(DrawError::InternalError)
}

fn next_day_start(day: NaiveDate) -> Result<DateTime<Utc>> {
    day.succ_opt().ok_or(DrawError::InternalError).and_then(day_start)
}
