//! Domain types for the reward draw engine.
//!
//! Everything the engine reads or writes is described here: balances, prizes,
//! the two grant kinds, history records and the global spin settings.
//!
//! Prizes use one closed tagged variant ([`Reward`]) with a single value per
//! variant. Loosely-typed storage records are converted into it once, at the
//! catalog boundary (see [`crate::catalog::PrizeRecord`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Authenticated user identifier, supplied by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a fresh random user ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Prize identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrizeId(pub i64);

impl fmt::Display for PrizeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grant identifier (free-spin and forced-win grants share the type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrantId(pub i64);

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current balances of one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    /// Spin tickets available.
    pub tickets: u64,
    /// Site currency ("coins").
    pub currency: u64,
}

/// What a prize does to the winner's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Reward {
    /// Credit site currency.
    Currency(u64),
    /// Credit spin tickets.
    Tickets(u64),
    /// A physical or digital item fulfilled manually; the value is the item's catalog value.
    Item(u64),
    /// "Better luck next time".
    Nothing,
}

impl Reward {
    /// The canonical value of this reward.
    #[must_use]
    pub const fn value(&self) -> u64 {
        match self {
            Self::Currency(v) | Self::Tickets(v) | Self::Item(v) => *v,
            Self::Nothing => 0,
        }
    }

    /// Storage/metrics label for the reward type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Currency(_) => "currency",
            Self::Tickets(_) => "ticket",
            Self::Item(_) => "item",
            Self::Nothing => "none",
        }
    }

    /// Claim status recorded in history for this reward.
    ///
    /// Currency and tickets are applied automatically; items and empty
    /// outcomes need manual follow-up outside the engine.
    #[must_use]
    pub const fn claim_status(&self) -> ClaimStatus {
        match self {
            Self::Currency(_) | Self::Tickets(_) => ClaimStatus::AutoAwarded,
            Self::Item(_) | Self::Nothing => ClaimStatus::Unclaimed,
        }
    }
}

/// A prize on the wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prize {
    /// Prize ID.
    pub id: PrizeId,
    /// Display name.
    pub name: String,
    /// Effect of winning this prize.
    pub reward: Reward,
    /// Relative probability mass. Always finite and non-negative.
    pub weight: f64,
    /// Inactive prizes never appear in a catalog snapshot.
    pub active: bool,
    /// Creation time, used for deterministic catalog ordering.
    pub created_at: DateTime<Utc>,
}

/// Time-boxed free-spin allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSpinGrant {
    /// Grant ID.
    pub id: GrantId,
    /// Owner.
    pub user_id: UserId,
    /// Spins left. Zero means inert; the row is kept.
    pub spins_remaining: u32,
    /// After this instant the grant is no longer eligible.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl FreeSpinGrant {
    /// Whether the grant can fund a spin at `now`.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.spins_remaining > 0 && self.expires_at.is_none_or(|at| at > now)
    }
}

/// Administrator-issued override that pins the outcome of a user's draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedWinGrant {
    /// Grant ID.
    pub id: GrantId,
    /// Target user.
    pub user_id: UserId,
    /// Prize to award.
    pub prize_id: PrizeId,
    /// Only active grants apply.
    pub active: bool,
    /// `None` means unlimited uses.
    pub max_uses: Option<u32>,
    /// Number of draws this grant has decided so far.
    pub use_count: u32,
    /// After this instant the grant no longer applies.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time. The newest eligible grant wins.
    pub created_at: DateTime<Utc>,
}

impl ForcedWinGrant {
    /// Whether the grant may decide a draw at `now`.
    #[must_use]
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.max_uses.is_none_or(|max| self.use_count < max)
            && self.expires_at.is_none_or(|at| at > now)
    }

    /// State after one successful use: `(use_count, active)`.
    #[must_use]
    pub fn after_use(&self) -> (u32, bool) {
        let use_count = self.use_count.saturating_add(1);
        let active = self.max_uses.is_none_or(|max| use_count < max);
        (use_count, active)
    }
}

/// Whether a prize effect was applied automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Balance already credited.
    AutoAwarded,
    /// Needs manual fulfilment.
    Unclaimed,
}

impl ClaimStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AutoAwarded => "auto_awarded",
            Self::Unclaimed => "unclaimed",
        }
    }

    /// Parse status from database string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto_awarded" => Some(Self::AutoAwarded),
            "unclaimed" => Some(Self::Unclaimed),
            _ => None,
        }
    }
}

/// How a draw was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Funding {
    /// `ticket_cost` tickets were deducted.
    Tickets {
        /// Tickets deducted.
        cost: u64,
    },
    /// One spin of a free-spin grant was consumed.
    FreeSpin {
        /// The consumed grant.
        grant_id: GrantId,
    },
}

impl Funding {
    /// Whether a grant paid for the draw.
    #[must_use]
    pub const fn is_grant(&self) -> bool {
        matches!(self, Self::FreeSpin { .. })
    }

    /// Storage/metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tickets { .. } => "ticket",
            Self::FreeSpin { .. } => "free_spin",
        }
    }
}

/// Immutable audit record, one per completed draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Assigned by the store on append; `0` before that.
    pub id: i64,
    /// Who drew.
    pub user_id: UserId,
    /// Winning prize.
    pub prize_id: PrizeId,
    /// Prize name at draw time.
    pub prize_name: String,
    /// Reward value at draw time.
    pub prize_value: u64,
    /// Reward type label at draw time.
    pub prize_kind: String,
    /// Whether the effect was applied automatically.
    pub claim_status: ClaimStatus,
    /// `"ticket"` or `"free_spin"`.
    pub funding: String,
    /// Whether a forced-win grant decided the outcome.
    pub forced: bool,
    /// When the draw completed.
    pub created_at: DateTime<Utc>,
}

/// Process-wide spin configuration, read fresh on every draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinSettings {
    /// Tickets charged for one funded spin.
    pub ticket_cost: u64,
    /// Global kill switch.
    pub enabled: bool,
}

impl Default for SpinSettings {
    fn default() -> Self {
        Self {
            ticket_cost: 1,
            enabled: true,
        }
    }
}
