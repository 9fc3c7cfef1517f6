//! In-memory draw store.
//!
//! Every trait operation takes the state mutex once and performs its check and
//! mutation under that single acquisition, so concurrent draws against the
//! same user behave like the conditional updates of the database store.
//!
//! Transactions are not isolated. Each mutation is applied immediately and a
//! compensating entry is pushed onto the transaction's journal; rollback (or
//! dropping an uncommitted transaction) replays the journal in reverse.
//! History records are staged and only become visible on commit.
//!
//! Because of that, another transaction can spend tickets or currency that an
//! uncommitted transaction credited. Revoking such a credit on rollback clamps
//! the balance at zero and makes [`DrawTransaction::rollback`] return an error;
//! a dropped transaction clamps silently.

use chrono::{DateTime, NaiveDate, Utc};
use spinwheel_core::catalog::{CatalogSnapshot, PrizeCatalog};
use spinwheel_core::daily::ClaimLog;
use spinwheel_core::grants::{GrantResolver, select_forced_win, select_free_spin};
use spinwheel_core::ledger::{Deduction, LedgerStore, deduct_in_place};
use spinwheel_core::settlement::HistoryLog;
use spinwheel_core::store::{DrawStore, DrawTransaction, HistoryQuery, SettingsSource};
use spinwheel_core::{
    Balances, DrawError, ForcedWinGrant, FreeSpinGrant, GrantId, HistoryRecord, Prize, PrizeId,
    Result, SpinSettings, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    balances: HashMap<UserId, Balances>,
    prizes: Vec<Prize>,
    free_spins: Vec<FreeSpinGrant>,
    forced_wins: Vec<ForcedWinGrant>,
    history: Vec<HistoryRecord>,
    claims: HashMap<(UserId, NaiveDate), u64>,
    settings: Option<SpinSettings>,
    next_id: i64,
    fail_next_history_append: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Compensating action for one applied mutation.
#[derive(Debug, Clone, Copy)]
enum Undo {
    RefundTickets { user_id: UserId, amount: u64 },
    RevokeTickets { user_id: UserId, amount: u64 },
    RevokeCurrency { user_id: UserId, amount: u64 },
    RestoreFreeSpin { grant_id: GrantId },
    RevertForcedWin { grant_id: GrantId, reactivate: bool },
    RemoveClaim { user_id: UserId, date: NaiveDate },
}

impl Undo {
    /// Returns `false` when a revoked credit had already been spent.
    fn apply(self, state: &mut State) -> bool {
        match self {
            Self::RefundTickets { user_id, amount } => {
                let balances = state.balances.entry(user_id).or_default();
                balances.tickets = balances.tickets.saturating_add(amount);
            }
            Self::RevokeTickets { user_id, amount } => {
                let balances = state.balances.entry(user_id).or_default();
                return revoke(&mut balances.tickets, amount);
            }
            Self::RevokeCurrency { user_id, amount } => {
                let balances = state.balances.entry(user_id).or_default();
                return revoke(&mut balances.currency, amount);
            }
            Self::RestoreFreeSpin { grant_id } => {
                if let Some(grant) = state.free_spins.iter_mut().find(|g| g.id == grant_id) {
                    grant.spins_remaining = grant.spins_remaining.saturating_add(1);
                }
            }
            Self::RevertForcedWin {
                grant_id,
                reactivate,
            } => {
                if let Some(grant) = state.forced_wins.iter_mut().find(|g| g.id == grant_id) {
                    grant.use_count = grant.use_count.saturating_sub(1);
                    if reactivate {
                        grant.active = true;
                    }
                }
            }
            Self::RemoveClaim { user_id, date } => {
                state.claims.remove(&(user_id, date));
            }
        }
        true
    }
}

fn revoke(balance: &mut u64, amount: u64) -> bool {
    match balance.checked_sub(amount) {
        Some(rest) => {
            *balance = rest;
            true
        }
        None => {
            *balance = 0;
            false
        }
    }
}

fn lock(state: &Mutex<State>) -> Result<MutexGuard<'_, State>> {
    state.lock().map_err(|_| DrawError::InternalError)
}

/// In-memory [`DrawStore`] for tests.
///
/// Cloning shares the underlying state.
///
/// # Example
///
/// ```
/// use spinwheel_testing::{InMemoryDrawStore, fixtures};
/// use spinwheel_core::UserId;
///
/// let store = InMemoryDrawStore::new();
/// let user = UserId::new();
/// store.set_balance(user, 3, 0);
/// store.insert_prize(fixtures::currency_prize(1, "100 Coins", 100, 1.0));
/// assert_eq!(store.balances_of(user).tickets, 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryDrawStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryDrawStore {
    /// Create an empty store: no prizes, no balances, no settings row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Admin helpers never fail; a poisoned lock is recovered.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set a user's balances.
    pub fn set_balance(&self, user_id: UserId, tickets: u64, currency: u64) {
        self.state()
            .balances
            .insert(user_id, Balances { tickets, currency });
    }

    /// A user's committed balances (zero for unknown users).
    #[must_use]
    pub fn balances_of(&self, user_id: UserId) -> Balances {
        self.state()
            .balances
            .get(&user_id)
            .copied()
            .unwrap_or_default()
    }

    /// Add or replace a prize.
    pub fn insert_prize(&self, prize: Prize) {
        let mut state = self.state();
        state.prizes.retain(|p| p.id != prize.id);
        state.prizes.push(prize);
    }

    /// Toggle a prize's active flag.
    pub fn set_prize_active(&self, prize_id: PrizeId, active: bool) {
        if let Some(prize) = self.state().prizes.iter_mut().find(|p| p.id == prize_id) {
            prize.active = active;
        }
    }

    /// Grant free spins; returns the grant id.
    pub fn grant_free_spins(
        &self,
        user_id: UserId,
        spins: u32,
        expires_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> GrantId {
        let mut state = self.state();
        let id = GrantId(state.next_id());
        state.free_spins.push(FreeSpinGrant {
            id,
            user_id,
            spins_remaining: spins,
            expires_at,
            created_at,
        });
        id
    }

    /// Assign a forced win; returns the grant id.
    pub fn assign_forced_win(
        &self,
        user_id: UserId,
        prize_id: PrizeId,
        max_uses: Option<u32>,
        expires_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> GrantId {
        let mut state = self.state();
        let id = GrantId(state.next_id());
        state.forced_wins.push(ForcedWinGrant {
            id,
            user_id,
            prize_id,
            active: true,
            max_uses,
            use_count: 0,
            expires_at,
            created_at,
        });
        id
    }

    /// Current state of a free-spin grant.
    #[must_use]
    pub fn free_spin(&self, grant_id: GrantId) -> Option<FreeSpinGrant> {
        self.state()
            .free_spins
            .iter()
            .find(|g| g.id == grant_id)
            .cloned()
    }

    /// Current state of a forced-win grant.
    #[must_use]
    pub fn forced_win(&self, grant_id: GrantId) -> Option<ForcedWinGrant> {
        self.state()
            .forced_wins
            .iter()
            .find(|g| g.id == grant_id)
            .cloned()
    }

    /// Write the settings row.
    pub fn set_settings(&self, settings: SpinSettings) {
        self.state().settings = Some(settings);
    }

    /// Delete the settings row.
    pub fn clear_settings(&self) {
        self.state().settings = None;
    }

    /// Seed a past daily claim.
    pub fn record_claim(&self, user_id: UserId, date: NaiveDate, tickets: u64) {
        self.state().claims.insert((user_id, date), tickets);
    }

    /// All committed history, in append order.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryRecord> {
        self.state().history.clone()
    }

    /// Make the next history append fail with a database error.
    pub fn fail_next_history_append(&self) {
        self.state().fail_next_history_append = true;
    }
}

impl PrizeCatalog for InMemoryDrawStore {
    async fn snapshot_active_prizes(&self) -> Result<CatalogSnapshot> {
        let prizes = lock(&self.state)?.prizes.clone();
        Ok(CatalogSnapshot::new(prizes))
    }

    async fn find_prize(&self, prize_id: PrizeId) -> Result<Option<Prize>> {
        Ok(lock(&self.state)?
            .prizes
            .iter()
            .find(|p| p.id == prize_id)
            .cloned())
    }
}

impl SettingsSource for InMemoryDrawStore {
    async fn load_settings(&self) -> Result<Option<SpinSettings>> {
        Ok(lock(&self.state)?.settings)
    }
}

impl HistoryQuery for InMemoryDrawStore {
    async fn history_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<HistoryRecord>> {
        let state = lock(&self.state)?;
        Ok(state
            .history
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let state = lock(&self.state)?;
        Ok(state.history.iter().rev().take(limit).cloned().collect())
    }
}

impl DrawStore for InMemoryDrawStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        Ok(InMemoryTransaction {
            state: Arc::clone(&self.state),
            journal: Vec::new(),
            staged_history: Vec::new(),
            finished: false,
        })
    }
}

/// Transaction over an [`InMemoryDrawStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    state: Arc<Mutex<State>>,
    journal: Vec<Undo>,
    staged_history: Vec<HistoryRecord>,
    finished: bool,
}

impl InMemoryTransaction {
    /// Returns `false` if any credit could not be fully revoked.
    fn undo_all(&mut self, state: &mut State) -> bool {
        let mut exact = true;
        while let Some(undo) = self.journal.pop() {
            exact &= undo.apply(state);
        }
        self.staged_history.clear();
        self.finished = true;
        exact
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let state = Arc::clone(&self.state);
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = self.undo_all(&mut guard);
    }
}

impl LedgerStore for InMemoryTransaction {
    async fn try_deduct_tickets(&mut self, user_id: UserId, cost: u64) -> Result<Deduction> {
        let mut state = lock(&self.state)?;
        let Some(balances) = state.balances.get_mut(&user_id) else {
            return Ok(deduct_in_place(&mut 0, cost));
        };
        let outcome = deduct_in_place(&mut balances.tickets, cost);
        if matches!(outcome, Deduction::Applied { .. }) && cost > 0 {
            self.journal.push(Undo::RefundTickets {
                user_id,
                amount: cost,
            });
        }
        Ok(outcome)
    }

    async fn credit_currency(&mut self, user_id: UserId, amount: u64) -> Result<Balances> {
        let mut state = lock(&self.state)?;
        let balances = state.balances.entry(user_id).or_default();
        balances.currency = balances
            .currency
            .checked_add(amount)
            .ok_or_else(|| DrawError::InvalidAmount(format!("currency overflow for {user_id}")))?;
        let after = *balances;
        self.journal.push(Undo::RevokeCurrency { user_id, amount });
        Ok(after)
    }

    async fn credit_tickets(&mut self, user_id: UserId, amount: u64) -> Result<Balances> {
        let mut state = lock(&self.state)?;
        let balances = state.balances.entry(user_id).or_default();
        balances.tickets = balances
            .tickets
            .checked_add(amount)
            .ok_or_else(|| DrawError::InvalidAmount(format!("ticket overflow for {user_id}")))?;
        let after = *balances;
        self.journal.push(Undo::RevokeTickets { user_id, amount });
        Ok(after)
    }

    async fn balances(&mut self, user_id: UserId) -> Result<Balances> {
        Ok(lock(&self.state)?
            .balances
            .get(&user_id)
            .copied()
            .unwrap_or_default())
    }
}

impl GrantResolver for InMemoryTransaction {
    async fn resolve_free_spin(
        &mut self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<FreeSpinGrant>> {
        let state = lock(&self.state)?;
        Ok(select_free_spin(
            state.free_spins.iter().filter(|g| g.user_id == user_id),
            now,
        )
        .cloned())
    }

    async fn consume_free_spin(
        &mut self,
        grant: &FreeSpinGrant,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = lock(&self.state)?;
        let Some(current) = state.free_spins.iter_mut().find(|g| g.id == grant.id) else {
            return Ok(false);
        };
        if !current.is_usable(now) {
            return Ok(false);
        }
        current.spins_remaining -= 1;
        self.journal.push(Undo::RestoreFreeSpin { grant_id: grant.id });
        Ok(true)
    }

    async fn resolve_forced_win(
        &mut self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<ForcedWinGrant>> {
        let state = lock(&self.state)?;
        Ok(select_forced_win(
            state.forced_wins.iter().filter(|g| g.user_id == user_id),
            now,
        )
        .cloned())
    }

    async fn consume_forced_win(&mut self, grant: &ForcedWinGrant) -> Result<bool> {
        let mut state = lock(&self.state)?;
        let Some(current) = state.forced_wins.iter_mut().find(|g| g.id == grant.id) else {
            return Ok(false);
        };
        if !current.active || current.max_uses.is_some_and(|max| current.use_count >= max) {
            return Ok(false);
        }
        let (use_count, active) = current.after_use();
        current.use_count = use_count;
        current.active = active;
        self.journal.push(Undo::RevertForcedWin {
            grant_id: grant.id,
            reactivate: !active,
        });
        Ok(true)
    }
}

impl HistoryLog for InMemoryTransaction {
    async fn append_history(&mut self, mut record: HistoryRecord) -> Result<HistoryRecord> {
        let mut state = lock(&self.state)?;
        if state.fail_next_history_append {
            state.fail_next_history_append = false;
            return Err(DrawError::DatabaseError(
                "injected history append failure".to_string(),
            ));
        }
        record.id = state.next_id();
        self.staged_history.push(record.clone());
        Ok(record)
    }
}

impl ClaimLog for InMemoryTransaction {
    async fn claim_dates_since(
        &mut self,
        user_id: UserId,
        since: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let state = lock(&self.state)?;
        let mut dates: Vec<NaiveDate> = state
            .claims
            .keys()
            .filter(|(owner, date)| *owner == user_id && *date >= since)
            .map(|(_, date)| *date)
            .collect();
        dates.sort_unstable();
        Ok(dates)
    }

    async fn record_daily_claim(
        &mut self,
        user_id: UserId,
        date: NaiveDate,
        tickets: u64,
        _claimed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = lock(&self.state)?;
        if state.claims.contains_key(&(user_id, date)) {
            return Ok(false);
        }
        state.claims.insert((user_id, date), tickets);
        self.journal.push(Undo::RemoveClaim { user_id, date });
        Ok(true)
    }
}

impl DrawTransaction for InMemoryTransaction {
    async fn commit(mut self) -> Result<()> {
        let mut state = lock(&self.state)?;
        state.history.append(&mut self.staged_history);
        self.journal.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        let state = Arc::clone(&self.state);
        let mut guard = lock(&state)?;
        if self.undo_all(&mut guard) {
            Ok(())
        } else {
            Err(DrawError::DatabaseError(
                "rollback revoked a credit already spent by another transaction".to_string(),
            ))
        }
    }
}
