//! Free-spin and forced-win grant resolution.
//!
//! Grants are created by the admin surface. The engine only reads them and
//! moves their consumption counters, each move being one conditional update.

use crate::error::Result;
use crate::types::{FreeSpinGrant, ForcedWinGrant, UserId};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Looks up and consumes per-user override state.
pub trait GrantResolver: Send {
    /// Find a usable free-spin grant: unexpired, `spins_remaining > 0`.
    ///
    /// When several qualify, the one expiring soonest is returned (grants
    /// without expiry last), then the oldest.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn resolve_free_spin(
        &mut self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<FreeSpinGrant>>> + Send;

    /// Take one spin from `grant`.
    ///
    /// Returns `false` when the grant no longer has a spin to give (another
    /// request consumed it, or it expired in the meantime).
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn consume_free_spin(
        &mut self,
        grant: &FreeSpinGrant,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Find the most recently created active, unexpired forced-win grant.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn resolve_forced_win(
        &mut self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<ForcedWinGrant>>> + Send;

    /// Record one use of `grant`, deactivating it when `max_uses` is reached.
    ///
    /// Returns `false` when the grant was already exhausted or deactivated.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn consume_forced_win(
        &mut self,
        grant: &ForcedWinGrant,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Pick the free-spin grant to use from a user's grants.
///
/// Ordering: soonest expiry first (no expiry last), then creation time, then id.
#[must_use]
pub fn select_free_spin<'a, I>(grants: I, now: DateTime<Utc>) -> Option<&'a FreeSpinGrant>
where
    I: IntoIterator<Item = &'a FreeSpinGrant>,
{
    grants
        .into_iter()
        .filter(|g| g.is_usable(now))
        .min_by_key(|g| (g.expires_at.is_none(), g.expires_at, g.created_at, g.id))
}

/// Pick the forced-win grant that applies from a user's grants.
#[must_use]
pub fn select_forced_win<'a, I>(grants: I, now: DateTime<Utc>) -> Option<&'a ForcedWinGrant>
where
    I: IntoIterator<Item = &'a ForcedWinGrant>,
{
    grants
        .into_iter()
        .filter(|g| g.is_eligible(now))
        .max_by_key(|g| (g.created_at, g.id))
}
