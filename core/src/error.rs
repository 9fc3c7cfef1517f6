//! Error types for draw, settlement and daily-claim operations.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, DrawError>;

/// Every way a draw (or a daily claim) can fail.
///
/// The first group is final, user-facing answers. The second group means an
/// administrator misconfigured something. The last group is infrastructure
/// trouble; the request fails closed and nothing is committed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawError {
    // ═══════════════════════════════════════════════════════════
    // User-recoverable
    // ═══════════════════════════════════════════════════════════

    /// The spin wheel is switched off.
    #[error("Spin wheel is currently disabled")]
    FeatureDisabled,

    /// Not enough tickets and no free spin to fund the draw.
    #[error("Insufficient ticket balance")]
    InsufficientBalance,

    /// Today's daily bonus was already claimed.
    #[error("Daily bonus already claimed today")]
    AlreadyClaimed,

    // ═══════════════════════════════════════════════════════════
    // Operational
    // ═══════════════════════════════════════════════════════════

    /// The catalog has no active prizes.
    #[error("No active prizes configured")]
    NoActivePrizes,

    /// A stored prize record could not be interpreted.
    #[error("Invalid prize record: {0}")]
    InvalidPrize(String),

    // ═══════════════════════════════════════════════════════════
    // Infrastructure
    // ═══════════════════════════════════════════════════════════

    /// A balance or counter does not fit the storage representation.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error")]
    InternalError,
}

impl DrawError {
    /// Stable machine-readable code for the API layer.
    ///
    /// # Examples
    ///
    /// ```
    /// # use spinwheel_core::DrawError;
    /// assert_eq!(DrawError::InsufficientBalance.code(), "INSUFFICIENT_BALANCE");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::FeatureDisabled => "FEATURE_DISABLED",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::AlreadyClaimed => "ALREADY_CLAIMED",
            Self::NoActivePrizes => "NO_ACTIVE_PRIZES",
            Self::InvalidPrize(_) => "INVALID_PRIZE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Returns `true` if the caller already holds a final answer and
    /// should be shown guidance rather than a generic failure.
    ///
    /// # Examples
    ///
    /// ```
    /// # use spinwheel_core::DrawError;
    /// assert!(DrawError::FeatureDisabled.is_user_error());
    /// assert!(!DrawError::NoActivePrizes.is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::FeatureDisabled | Self::InsufficientBalance | Self::AlreadyClaimed
        )
    }

    /// Returns `true` if an operator should be alerted.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        matches!(self, Self::NoActivePrizes | Self::InvalidPrize(_))
    }
}

impl Serialize for DrawError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}
