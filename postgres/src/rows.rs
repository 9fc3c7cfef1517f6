//! Row decoding and integer conversions between storage and domain types.
//!
//! Balances and values are `BIGINT` in storage and `u64` in the domain; counts
//! are `INTEGER` and `u32`. Conversions fail with `InvalidAmount` instead of
//! wrapping.

use spinwheel_core::{
    ClaimStatus, DrawError, ForcedWinGrant, FreeSpinGrant, GrantId, HistoryRecord, PrizeId,
    PrizeRecord, Result, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::{Decode, Postgres, Row, Type};

pub(crate) fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DrawError::DatabaseError(format!("Failed to decode column {name}: {e}")))
}

pub(crate) fn to_db_amount(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| DrawError::InvalidAmount(format!("{value} does not fit in BIGINT")))
}

pub(crate) fn from_db_amount(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| DrawError::InvalidAmount(format!("negative amount {value}")))
}

fn from_db_count(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| DrawError::InvalidAmount(format!("negative count {value}")))
}

pub(crate) fn limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

pub(crate) fn prize_record(row: &PgRow) -> Result<PrizeRecord> {
    Ok(PrizeRecord {
        id: column(row, "id")?,
        name: column(row, "name")?,
        prize_type: column(row, "prize_type")?,
        value: column(row, "value")?,
        amount: column(row, "amount")?,
        coins: column(row, "coins")?,
        weight: column(row, "weight")?,
        is_active: column(row, "is_active")?,
        created_at: column(row, "created_at")?,
    })
}

pub(crate) fn free_spin_grant(row: &PgRow) -> Result<FreeSpinGrant> {
    Ok(FreeSpinGrant {
        id: GrantId(column(row, "id")?),
        user_id: UserId(column(row, "user_id")?),
        spins_remaining: from_db_count(column(row, "spins_remaining")?)?,
        expires_at: column(row, "expires_at")?,
        created_at: column(row, "created_at")?,
    })
}

pub(crate) fn forced_win_grant(row: &PgRow) -> Result<ForcedWinGrant> {
    let max_uses: Option<i32> = column(row, "max_uses")?;
    Ok(ForcedWinGrant {
        id: GrantId(column(row, "id")?),
        user_id: UserId(column(row, "user_id")?),
        prize_id: PrizeId(column(row, "prize_id")?),
        active: column(row, "is_active")?,
        max_uses: max_uses.map(from_db_count).transpose()?,
        use_count: from_db_count(column(row, "use_count")?)?,
        expires_at: column(row, "expires_at")?,
        created_at: column(row, "created_at")?,
    })
}

pub(crate) fn history_record(row: &PgRow) -> Result<HistoryRecord> {
    let status: String = column(row, "claim_status")?;
    let claim_status = ClaimStatus::parse(&status)
        .ok_or_else(|| DrawError::DatabaseError(format!("Invalid claim status: {status}")))?;

    Ok(HistoryRecord {
        id: column(row, "id")?,
        user_id: UserId(column(row, "user_id")?),
        prize_id: PrizeId(column(row, "prize_id")?),
        prize_name: column(row, "prize_name")?,
        prize_value: from_db_amount(column(row, "prize_value")?)?,
        prize_kind: column(row, "prize_type")?,
        claim_status,
        funding: column(row, "funding")?,
        forced: column(row, "forced")?,
        created_at: column(row, "created_at")?,
    })
}
