//! Persistence seam for the engine.
//!
//! A [`DrawStore`] exposes the read-only side (catalog, settings, history
//! queries) and opens [`DrawTransaction`]s for everything that mutates. Funding
//! consumption and settlement happen inside one transaction, so they commit or
//! roll back together.
//!
//! # Implementations
//!
//! - `PostgresDrawStore` (in `spinwheel-postgres`): database transaction, every
//!   counter move is one `UPDATE … WHERE … RETURNING` statement
//! - `InMemoryDrawStore` (in `spinwheel-testing`): mutex-guarded state with an
//!   undo journal replayed on rollback

use crate::catalog::PrizeCatalog;
use crate::daily::ClaimLog;
use crate::error::Result;
use crate::grants::GrantResolver;
use crate::ledger::LedgerStore;
use crate::settlement::HistoryLog;
use crate::types::{HistoryRecord, SpinSettings, UserId};
use std::future::Future;

/// Source of the global spin settings.
pub trait SettingsSource: Send + Sync {
    /// Load the current settings; `None` when no settings row exists.
    ///
    /// Called on every draw. Implementations must not cache.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn load_settings(&self) -> impl Future<Output = Result<Option<SpinSettings>>> + Send;
}

/// Read access to the draw history.
pub trait HistoryQuery: Send + Sync {
    /// A user's records, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn history_for_user(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>>> + Send;

    /// Most recent records across all users, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails.
    fn recent_history(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>>> + Send;
}

/// One unit of work: every mutation of a draw or a daily claim.
///
/// Dropping a transaction without committing rolls it back.
pub trait DrawTransaction: LedgerStore + GrantResolver + HistoryLog + ClaimLog + Send {
    /// Make every change in this transaction durable.
    ///
    /// # Errors
    ///
    /// Returns error if the commit fails; nothing is applied in that case.
    fn commit(self) -> impl Future<Output = Result<()>> + Send;

    /// Undo every change in this transaction.
    ///
    /// # Errors
    ///
    /// Returns error if the rollback could not be confirmed.
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}

/// Everything the engine needs from storage.
pub trait DrawStore: PrizeCatalog + SettingsSource + HistoryQuery + Send + Sync {
    /// The transaction type handed out by [`begin`](Self::begin).
    type Tx: DrawTransaction;

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns error if no connection is available.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx>> + Send;
}
