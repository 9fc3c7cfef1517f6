//! Prize fixtures.
//!
//! Creation times are spaced one second apart by id so catalog order follows
//! the ids given.

use chrono::{DateTime, Duration, Utc};
use spinwheel_core::{Prize, PrizeId, Reward};

/// Base timestamp for fixture creation times.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::days(19_000)
}

/// An active prize.
#[must_use]
pub fn prize(id: i64, name: &str, reward: Reward, weight: f64) -> Prize {
    Prize {
        id: PrizeId(id),
        name: name.to_string(),
        reward,
        weight,
        active: true,
        created_at: epoch() + Duration::seconds(id),
    }
}

/// An active currency prize.
#[must_use]
pub fn currency_prize(id: i64, name: &str, amount: u64, weight: f64) -> Prize {
    prize(id, name, Reward::Currency(amount), weight)
}

/// An active ticket prize.
#[must_use]
pub fn ticket_prize(id: i64, name: &str, tickets: u64, weight: f64) -> Prize {
    prize(id, name, Reward::Tickets(tickets), weight)
}

/// An active "nothing" outcome.
#[must_use]
pub fn nothing_prize(id: i64, weight: f64) -> Prize {
    prize(id, "Nothing", Reward::Nothing, weight)
}

/// An inactive copy of `prize`.
#[must_use]
pub fn inactive(mut prize: Prize) -> Prize {
    prize.active = false;
    prize
}
