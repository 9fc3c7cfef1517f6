//! Draw engine metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `spinwheel_draws_total{funding, reward, forced}` - Completed draws
//! - `spinwheel_draws_rejected_total{reason}` - Draws refused before commit
//! - `spinwheel_draws_rolled_back_total` - Draws whose transaction was rolled back
//! - `spinwheel_currency_awarded_total` - Currency credited by prizes
//! - `spinwheel_tickets_awarded_total` - Tickets credited by prizes
//! - `spinwheel_daily_claims_total` - Daily bonus claims
//! - `spinwheel_daily_claim_tickets_total` - Tickets granted by daily claims
//!
//! ## Histograms
//! - `spinwheel_draw_duration_seconds` - Wall time of one draw

use crate::types::{Funding, Reward};
use metrics::{describe_counter, describe_histogram};

/// Register all metric descriptions.
///
/// Call once at application startup, before any metrics are recorded.
pub fn register_draw_metrics() {
    describe_counter!(
        "spinwheel_draws_total",
        "Completed draws by funding source, reward type and override"
    );
    describe_counter!(
        "spinwheel_draws_rejected_total",
        "Draws refused by reason (FEATURE_DISABLED, INSUFFICIENT_BALANCE, NO_ACTIVE_PRIZES, ...)"
    );
    describe_counter!(
        "spinwheel_draws_rolled_back_total",
        "Draws whose transaction was rolled back after opening"
    );
    describe_counter!(
        "spinwheel_currency_awarded_total",
        "Currency credited by spin prizes"
    );
    describe_counter!(
        "spinwheel_tickets_awarded_total",
        "Tickets credited by spin prizes"
    );
    describe_counter!(
        "spinwheel_daily_claims_total",
        "Daily bonus claims"
    );
    describe_counter!(
        "spinwheel_daily_claim_tickets_total",
        "Tickets granted by daily bonus claims"
    );
    describe_histogram!(
        "spinwheel_draw_duration_seconds",
        "Time taken by one draw, from gate to commit"
    );

    tracing::info!("Spin wheel metrics registered");
}

/// Record a completed draw.
pub fn record_draw_completed(funding: Funding, reward: Reward, forced: bool, duration_secs: f64) {
    metrics::counter!(
        "spinwheel_draws_total",
        "funding" => funding.as_str(),
        "reward" => reward.kind(),
        "forced" => if forced { "true" } else { "false" }
    )
    .increment(1);
    metrics::histogram!("spinwheel_draw_duration_seconds").record(duration_secs);

    match reward {
        Reward::Currency(amount) => {
            metrics::counter!("spinwheel_currency_awarded_total").increment(amount);
        }
        Reward::Tickets(count) => {
            metrics::counter!("spinwheel_tickets_awarded_total").increment(count);
        }
        Reward::Item(_) | Reward::Nothing => {}
    }
}

/// Record a refused draw.
pub fn record_draw_rejected(reason: &'static str) {
    metrics::counter!("spinwheel_draws_rejected_total", "reason" => reason).increment(1);
}

/// Record a rolled back draw transaction.
pub fn record_draw_rolled_back() {
    metrics::counter!("spinwheel_draws_rolled_back_total").increment(1);
}

/// Record a daily bonus claim.
pub fn record_daily_claim(tickets: u64) {
    metrics::counter!("spinwheel_daily_claims_total").increment(1);
    metrics::counter!("spinwheel_daily_claim_tickets_total").increment(tickets);
}
