//! Weighted prize selection.
//!
//! Pure in-memory computation with no suspension point. Given the same
//! snapshot and the same sample the result is always the same prize.

use crate::catalog::CatalogSnapshot;
use crate::types::Prize;

/// Pick a prize by cumulative weight.
///
/// `r` must lie in `[0, total_weight)`. Prizes are walked in snapshot order:
/// if `r < weight` that prize wins, otherwise `r` is reduced by `weight` and the
/// walk continues. When nothing matches (floating-point residue, or every
/// weight is zero) the last prize wins.
///
/// Returns `None` only for an empty snapshot.
#[must_use]
pub fn pick_weighted(snapshot: &CatalogSnapshot, r: f64) -> Option<&Prize> {
    let mut remaining = r;
    for prize in snapshot.prizes() {
        if remaining < prize.weight {
            return Some(prize);
        }
        remaining -= prize.weight;
    }
    snapshot.prizes().last()
}

/// Scale a unit sample in `[0, 1)` onto the snapshot's total weight and pick.
#[must_use]
pub fn pick_with_unit(snapshot: &CatalogSnapshot, unit: f64) -> Option<&Prize> {
    pick_weighted(snapshot, unit.clamp(0.0, 1.0) * snapshot.total_weight())
}
