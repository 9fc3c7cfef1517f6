//! # Spinwheel Core
//!
//! Reward draw engine for a spin wheel: a user pays one ticket (or one free
//! spin), a prize is picked by weight (or pinned by an administrator's
//! forced-win grant), and the prize is credited and recorded in one unit.
//!
//! ## Components
//!
//! - [`LedgerStore`]: conditional ticket deduction and balance credits
//! - [`GrantResolver`]: free-spin and forced-win grants
//! - [`PrizeCatalog`]: active prize snapshot, stored rows resolved to [`Prize`]
//! - [`DrawEngine`]: gate, fund, select, settle
//! - [`SettlementWriter`]: prize effects and the append-only history
//! - [`DailyClaimService`]: once-a-day bonus tickets with streaks
//!
//! Storage is abstracted by [`DrawStore`]; see `spinwheel-postgres` for the
//! production implementation and `spinwheel-testing` for the in-memory one.
//!
//! ## Example
//!
//! ```ignore
//! use spinwheel_core::{DrawEngine, EngineConfig, SystemClock, ThreadRandom, UserId};
//!
//! let engine = DrawEngine::new(store, ThreadRandom, SystemClock, EngineConfig::default());
//! let receipt = engine.draw(user_id).await?;
//! println!("{}", receipt.message);
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod daily;
pub mod engine;
pub mod environment;
pub mod error;
pub mod grants;
pub mod ledger;
pub mod metrics;
pub mod selection;
pub mod settlement;
pub mod stats;
pub mod store;
pub mod types;

pub use catalog::{CatalogSnapshot, PrizeCatalog, PrizeRecord};
pub use config::{DailyClaimConfig, EngineConfig};
pub use daily::{ClaimLog, DailyClaimReceipt, DailyClaimService, DailyClaimStatus};
pub use engine::{DrawEngine, DrawReceipt};
pub use environment::{Clock, RandomSource, SeededRandom, SystemClock, ThreadRandom};
pub use error::{DrawError, Result};
pub use grants::GrantResolver;
pub use ledger::{Deduction, LedgerStore};
pub use settlement::{HistoryLog, SettlementResult, SettlementWriter};
pub use stats::DrawStats;
pub use store::{DrawStore, DrawTransaction, HistoryQuery, SettingsSource};
pub use types::{
    Balances, ClaimStatus, ForcedWinGrant, FreeSpinGrant, Funding, GrantId, HistoryRecord, Prize,
    PrizeId, Reward, SpinSettings, UserId,
};
