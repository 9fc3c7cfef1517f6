//! Engine configuration.
//!
//! Values are provided by the application. Runtime switches that an operator
//! may flip at any time (`enabled`, `ticket_cost`) live in storage as
//! [`SpinSettings`]; the values here only fill in when no settings row exists.

use crate::types::SpinSettings;

/// Daily bonus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyClaimConfig {
    /// Tickets granted for a claim without a streak.
    ///
    /// Default: 1
    pub base_tickets: u64,

    /// `(min_streak, tickets)` tiers; the highest tier reached applies.
    ///
    /// Default: 3 days → 2 tickets, 7 days → 3 tickets
    pub streak_tiers: Vec<(u32, u64)>,

    /// How many past days are inspected when computing the streak.
    ///
    /// Default: 30
    pub lookback_days: u32,
}

impl DailyClaimConfig {
    /// Create a daily claim configuration with no streak tiers.
    #[must_use]
    pub const fn new(base_tickets: u64) -> Self {
        Self {
            base_tickets,
            streak_tiers: Vec::new(),
            lookback_days: 30,
        }
    }

    /// Add a streak tier.
    #[must_use]
    pub fn with_tier(mut self, min_streak: u32, tickets: u64) -> Self {
        self.streak_tiers.push((min_streak, tickets));
        self.streak_tiers.sort_unstable();
        self
    }

    /// Set the streak look-back window.
    #[must_use]
    pub const fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    /// Tickets granted for a claim that makes the streak `streak` days long.
    #[must_use]
    pub fn tickets_for_streak(&self, streak: u32) -> u64 {
        self.streak_tiers
            .iter()
            .rev()
            .find(|(min, _)| streak >= *min)
            .map_or(self.base_tickets, |(_, tickets)| *tickets)
    }
}

impl Default for DailyClaimConfig {
    fn default() -> Self {
        Self::new(1).with_tier(3, 2).with_tier(7, 3)
    }
}

/// Draw engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Settings used when storage has no settings row.
    ///
    /// Default: cost 1 ticket, enabled
    pub default_settings: SpinSettings,

    /// Daily bonus configuration.
    pub daily_claim: DailyClaimConfig,
}

impl EngineConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback settings.
    #[must_use]
    pub const fn with_default_settings(mut self, settings: SpinSettings) -> Self {
        self.default_settings = settings;
        self
    }

    /// Set the daily bonus configuration.
    #[must_use]
    pub fn with_daily_claim(mut self, daily_claim: DailyClaimConfig) -> Self {
        self.daily_claim = daily_claim;
        self
    }
}
