//! Property-based testing strategies for domain types.

use proptest::prelude::*;
use spinwheel_core::Reward;

/// Any prize reward with a modest value.
pub fn arb_reward() -> impl Strategy<Value = Reward> {
    prop_oneof![
        (0_u64..1_000).prop_map(Reward::Currency),
        (0_u64..10).prop_map(Reward::Tickets),
        (1_u64..100).prop_map(Reward::Item),
        Just(Reward::Nothing),
    ]
}

/// Non-negative finite weights for a catalog of one to eight prizes.
pub fn arb_weights() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0_f64..100.0, 1..8)
}

/// A sequence of ledger operations against one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOp {
    /// Attempt to deduct this many tickets.
    Deduct(u64),
    /// Credit this many tickets.
    CreditTickets(u64),
    /// Credit this much currency.
    CreditCurrency(u64),
}

/// Random ledger operation.
pub fn arb_ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        3 => (0_u64..5).prop_map(LedgerOp::Deduct),
        1 => (0_u64..5).prop_map(LedgerOp::CreditTickets),
        1 => (0_u64..500).prop_map(LedgerOp::CreditCurrency),
    ]
}
