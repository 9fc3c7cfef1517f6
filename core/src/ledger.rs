//! Ticket and currency ledger.
//!
//! Every balance change is a single conditional update at the store. There is
//! no read-then-write path anywhere: a deduction either happens atomically
//! against the current row or reports [`Deduction::Insufficient`].

use crate::error::Result;
use crate::types::{Balances, UserId};
use std::future::Future;

/// Outcome of a conditional ticket deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deduction {
    /// Tickets were deducted; `remaining` is the post-decrement balance.
    Applied {
        /// Ticket balance after the deduction.
        remaining: u64,
    },
    /// Balance was lower than the cost. Nothing changed.
    Insufficient,
}

/// Per-user balance store.
///
/// Implementations must make [`try_deduct_tickets`](Self::try_deduct_tickets)
/// indivisible: two concurrent callers against one remaining ticket can never
/// both observe `Applied`.
pub trait LedgerStore: Send {
    /// Deduct `cost` tickets iff the balance covers it.
    ///
    /// A cost of zero always succeeds. A user without a balance row has zero
    /// tickets.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn try_deduct_tickets(
        &mut self,
        user_id: UserId,
        cost: u64,
    ) -> impl Future<Output = Result<Deduction>> + Send;

    /// Add currency. Creates the balance row when missing.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails or the balance would overflow.
    fn credit_currency(
        &mut self,
        user_id: UserId,
        amount: u64,
    ) -> impl Future<Output = Result<Balances>> + Send;

    /// Add tickets. Creates the balance row when missing.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails or the balance would overflow.
    fn credit_tickets(
        &mut self,
        user_id: UserId,
        amount: u64,
    ) -> impl Future<Output = Result<Balances>> + Send;

    /// Current balances (zero for unknown users).
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn balances(&mut self, user_id: UserId) -> impl Future<Output = Result<Balances>> + Send;
}

/// Apply a conditional deduction to an in-memory balance.
///
/// Shared by stores that keep balances in process; the caller must hold the
/// lock guarding `balance` for the whole call.
#[must_use]
pub const fn deduct_in_place(balance: &mut u64, cost: u64) -> Deduction {
    match balance.checked_sub(cost) {
        Some(remaining) => {
            *balance = remaining;
            Deduction::Applied { remaining }
        }
        None => Deduction::Insufficient,
    }
}
