//! Prize catalog: the boundary where stored prize rows become [`Prize`] values,
//! and the per-draw snapshot of active prizes.

use crate::error::{DrawError, Result};
use crate::types::{Prize, PrizeId, Reward};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Prize row as it comes out of storage.
///
/// Older rows used different type spellings and value columns (`value`,
/// `amount`, `coins`). This is the only place that knows about them.
#[derive(Debug, Clone, PartialEq)]
pub struct PrizeRecord {
    /// Row ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form type column.
    pub prize_type: String,
    /// Canonical value column.
    pub value: Option<i64>,
    /// Legacy value column.
    pub amount: Option<i64>,
    /// Legacy value column used by currency prizes.
    pub coins: Option<i64>,
    /// Relative weight ("probability" in older rows).
    pub weight: f64,
    /// Whether the prize is on the wheel.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PrizeRecord> for Prize {
    type Error = DrawError;

    fn try_from(record: PrizeRecord) -> Result<Self> {
        if !record.weight.is_finite() || record.weight < 0.0 {
            return Err(DrawError::InvalidPrize(format!(
                "prize {} has invalid weight {}",
                record.id, record.weight
            )));
        }

        let raw = record.value.or(record.amount).or(record.coins).unwrap_or(0);
        let value = u64::try_from(raw).map_err(|_| {
            DrawError::InvalidPrize(format!("prize {} has negative value {raw}", record.id))
        })?;

        let reward = match record.prize_type.trim().to_ascii_lowercase().as_str() {
            "currency" | "coin" | "coins" => Reward::Currency(value),
            "ticket" | "tickets" => Reward::Tickets(value),
            "item" => Reward::Item(value),
            "none" | "nothing" | "" => Reward::Nothing,
            other => {
                return Err(DrawError::InvalidPrize(format!(
                    "prize {} has unknown type {other:?}",
                    record.id
                )));
            }
        };

        Ok(Self {
            id: PrizeId(record.id),
            name: record.name,
            reward,
            weight: record.weight,
            active: record.is_active,
            created_at: record.created_at,
        })
    }
}

/// All active prizes, in a fixed order, as read once for one draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    prizes: Vec<Prize>,
}

impl CatalogSnapshot {
    /// Build a snapshot from prizes in any order.
    ///
    /// Inactive prizes are dropped; the rest are ordered by creation time,
    /// then id.
    #[must_use]
    pub fn new(mut prizes: Vec<Prize>) -> Self {
        prizes.retain(|p| p.active);
        prizes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Self { prizes }
    }

    /// Prizes in draw order.
    #[must_use]
    pub fn prizes(&self) -> &[Prize] {
        &self.prizes
    }

    /// Whether no prize is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prizes.is_empty()
    }

    /// Number of active prizes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prizes.len()
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.prizes.iter().map(|p| p.weight).sum()
    }

    /// Look up a prize in this snapshot.
    #[must_use]
    pub fn get(&self, id: PrizeId) -> Option<&Prize> {
        self.prizes.iter().find(|p| p.id == id)
    }
}

/// Read-only access to the prize catalog.
pub trait PrizeCatalog: Send + Sync {
    /// Snapshot the active prizes in deterministic order.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails or a row is invalid.
    fn snapshot_active_prizes(&self) -> impl Future<Output = Result<CatalogSnapshot>> + Send;

    /// Fetch one prize by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns error if the database call fails or the row is invalid.
    fn find_prize(&self, prize_id: PrizeId) -> impl Future<Output = Result<Option<Prize>>> + Send;
}
