//! Aggregate figures over the draw history, for the admin dashboard.

use crate::types::{HistoryRecord, UserId};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Summary of a set of history records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrawStats {
    /// Number of records.
    pub total_draws: u64,
    /// Distinct users that drew.
    pub unique_users: u64,
    /// Sum of currency prize values.
    pub currency_awarded: u64,
    /// Sum of ticket prize values.
    pub tickets_awarded: u64,
    /// Draws decided by a forced-win grant.
    pub forced_draws: u64,
    /// Draws dated `today` (UTC).
    pub today_draws: u64,
    /// Currency awarded per draw, rounded to one decimal.
    pub average_currency_per_draw: f64,
    /// Prize name won most often. Ties go to the alphabetically first name.
    pub most_won_prize: Option<String>,
}

impl DrawStats {
    /// Summarise `records`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Display figure only
    pub fn summarize(records: &[HistoryRecord], today: NaiveDate) -> Self {
        let mut stats = Self::default();
        let mut users: HashSet<UserId> = HashSet::new();
        let mut wins: HashMap<&str, u64> = HashMap::new();

        for record in records {
            stats.total_draws = stats.total_draws.saturating_add(1);
            users.insert(record.user_id);
            let count = wins.entry(record.prize_name.as_str()).or_default();
            *count = count.saturating_add(1);

            match record.prize_kind.as_str() {
                "currency" => {
                    stats.currency_awarded =
                        stats.currency_awarded.saturating_add(record.prize_value);
                }
                "ticket" => {
                    stats.tickets_awarded =
                        stats.tickets_awarded.saturating_add(record.prize_value);
                }
                _ => {}
            }
            if record.forced {
                stats.forced_draws = stats.forced_draws.saturating_add(1);
            }
            if record.created_at.date_naive() == today {
                stats.today_draws = stats.today_draws.saturating_add(1);
            }
        }

        stats.unique_users = users.len() as u64;
        if stats.total_draws > 0 {
            let average = stats.currency_awarded as f64 / stats.total_draws as f64;
            stats.average_currency_per_draw = (average * 10.0).round() / 10.0;
        }
        stats.most_won_prize = wins
            .into_iter()
            .max_by(|(a_name, a_count), (b_name, b_count)| {
                a_count.cmp(b_count).then_with(|| b_name.cmp(a_name))
            })
            .map(|(name, _)| name.to_string());

        stats
    }
}
