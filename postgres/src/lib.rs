//! `PostgreSQL` store for the spin wheel draw engine.
//!
//! This crate implements the `DrawStore` trait from `spinwheel-core` on top of
//! sqlx:
//!
//! - Balances, grants and daily claims change only through single-statement
//!   conditional updates
//! - Funding and settlement run inside one database transaction
//! - Draw history is append-only (enforced by a trigger)
//! - Embedded migrations
//!
//! # Example
//!
//! ```ignore
//! use spinwheel_postgres::{PostgresConfig, PostgresDrawStore};
//! use spinwheel_core::{DrawEngine, EngineConfig, SystemClock, ThreadRandom};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresDrawStore::connect(&PostgresConfig::from_env()).await?;
//!     store.migrate().await?;
//!     let engine = DrawEngine::new(store, ThreadRandom, SystemClock, EngineConfig::default());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod rows;
pub mod transaction;

pub use config::PostgresConfig;
pub use transaction::PostgresDrawTransaction;

use spinwheel_core::catalog::{CatalogSnapshot, PrizeCatalog};
use spinwheel_core::store::{DrawStore, HistoryQuery, SettingsSource};
use spinwheel_core::{DrawError, HistoryRecord, Prize, PrizeId, Result, SpinSettings, UserId};
use sqlx::PgPool;

/// `PostgreSQL` draw store.
#[derive(Clone)]
pub struct PostgresDrawStore {
    /// `PostgreSQL` connection pool.
    pool: PgPool,
}

impl PostgresDrawStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::DatabaseError`] if the database is unreachable.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = config.connect().await?;
        tracing::info!(database = config.redacted_url(), "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DrawError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    async fn fetch_history(
        &self,
        user_id: Option<UserId>,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>> {
        let records = sqlx::query(
            r"
            SELECT id, user_id, prize_id, prize_name, prize_value, prize_type,
                   claim_status, funding, forced, created_at
            FROM spin_history
            WHERE $1::uuid IS NULL OR user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(user_id.map(|id| id.0))
        .bind(rows::limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to load history: {e}")))?;

        records.iter().map(rows::history_record).collect()
    }
}

impl PrizeCatalog for PostgresDrawStore {
    async fn snapshot_active_prizes(&self) -> Result<CatalogSnapshot> {
        let records = sqlx::query(
            r"
            SELECT id, name, prize_type, value, amount, coins, weight, is_active, created_at
            FROM spin_prizes
            WHERE is_active
            ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to load prizes: {e}")))?;

        let prizes = records
            .iter()
            .map(|row| rows::prize_record(row).and_then(Prize::try_from))
            .collect::<Result<Vec<_>>>()?;
        Ok(CatalogSnapshot::new(prizes))
    }

    async fn find_prize(&self, prize_id: PrizeId) -> Result<Option<Prize>> {
        let row = sqlx::query(
            r"
            SELECT id, name, prize_type, value, amount, coins, weight, is_active, created_at
            FROM spin_prizes
            WHERE id = $1
            ",
        )
        .bind(prize_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to load prize: {e}")))?;

        row.as_ref()
            .map(|row| rows::prize_record(row).and_then(Prize::try_from))
            .transpose()
    }
}

impl SettingsSource for PostgresDrawStore {
    async fn load_settings(&self) -> Result<Option<SpinSettings>> {
        let row = sqlx::query(
            r"
            SELECT ticket_cost, enabled
            FROM spin_settings
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DrawError::DatabaseError(format!("Failed to load settings: {e}")))?;

        row.map(|row| {
            Ok(SpinSettings {
                ticket_cost: rows::from_db_amount(rows::column(&row, "ticket_cost")?)?,
                enabled: rows::column(&row, "enabled")?,
            })
        })
        .transpose()
    }
}

impl HistoryQuery for PostgresDrawStore {
    async fn history_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<HistoryRecord>> {
        self.fetch_history(Some(user_id), limit).await
    }

    async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        self.fetch_history(None, limit).await
    }
}

impl DrawStore for PostgresDrawStore {
    type Tx = PostgresDrawTransaction;

    async fn begin(&self) -> Result<PostgresDrawTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DrawError::DatabaseError(format!("Failed to begin transaction: {e}")))?;
        Ok(PostgresDrawTransaction::new(tx))
    }
}
