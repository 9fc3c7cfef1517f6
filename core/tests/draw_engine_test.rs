//! Draw engine tests against the in-memory store.

#![allow(clippy::expect_used)] // Test code uses expect for clear failure messages

use chrono::Duration;
use spinwheel_core::{
    ClaimStatus, Clock, DrawEngine, DrawError, DrawStats, EngineConfig, HistoryQuery, Reward,
    PrizeId, SpinSettings, UserId,
};
use spinwheel_testing::{
    FixedClock, InMemoryDrawStore, ScriptedRandom, fixtures, init_test_tracing, test_clock,
};

type TestEngine = DrawEngine<InMemoryDrawStore, ScriptedRandom, FixedClock>;

fn engine_with(store: &InMemoryDrawStore, samples: Vec<f64>) -> TestEngine {
    init_test_tracing();
    spinwheel_core::metrics::register_draw_metrics();
    DrawEngine::new(
        store.clone(),
        ScriptedRandom::new(samples),
        test_clock(),
        EngineConfig::default(),
    )
}

fn fifty_fifty(store: &InMemoryDrawStore) {
    store.insert_prize(fixtures::currency_prize(1, "100 Coins", 100, 50.0));
    store.insert_prize(fixtures::ticket_prize(2, "2 Tickets", 2, 50.0));
}

#[tokio::test]
async fn weighted_draw_deducts_and_credits() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    store.set_balance(user, 3, 0);

    // r = 0.2 * 100 = 20 < 50
    let receipt = engine_with(&store, vec![0.2]).draw(user).await.expect("draw");

    assert_eq!(receipt.prize.name, "100 Coins");
    assert_eq!(receipt.remaining_tickets, 2);
    assert_eq!(receipt.remaining_currency, 100);
    assert!(!receipt.funded_by_grant);
    assert!(!receipt.forced);
    assert_eq!(receipt.message, "You won 100 Coins!");

    let history = store.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, receipt.history_id);
    assert_eq!(history[0].claim_status, ClaimStatus::AutoAwarded);
    assert_eq!(history[0].funding, "ticket");
    assert_eq!(history[0].prize_value, 100);
}

#[tokio::test]
async fn ticket_prize_credits_tickets_after_deduction() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    store.set_balance(user, 1, 0);

    let receipt = engine_with(&store, vec![0.9]).draw(user).await.expect("draw");

    assert_eq!(receipt.prize.name, "2 Tickets");
    assert_eq!(receipt.remaining_tickets, 2);
    assert_eq!(store.balances_of(user).tickets, 2);
}

#[tokio::test]
async fn free_spin_funds_draw_without_touching_tickets() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    let grant = store.grant_free_spins(user, 1, None, fixtures::epoch());

    let receipt = engine_with(&store, vec![0.2]).draw(user).await.expect("draw");

    assert!(receipt.funded_by_grant);
    assert_eq!(receipt.remaining_tickets, 0);
    assert_eq!(store.free_spin(grant).expect("grant").spins_remaining, 0);
    assert_eq!(store.history()[0].funding, "free_spin");

    // Spent grant stays inert; with no tickets the next draw is refused.
    let second = engine_with(&store, vec![0.2]).draw(user).await;
    assert_eq!(second, Err(DrawError::InsufficientBalance));
}

#[tokio::test]
async fn expired_free_spin_is_ignored() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    let expired = test_clock().now() - Duration::hours(1);
    let grant = store.grant_free_spins(user, 3, Some(expired), fixtures::epoch());
    store.set_balance(user, 1, 0);

    let receipt = engine_with(&store, vec![0.2]).draw(user).await.expect("draw");

    assert!(!receipt.funded_by_grant);
    assert_eq!(store.free_spin(grant).expect("grant").spins_remaining, 3);
}

#[tokio::test]
async fn forced_win_applies_once_then_weighted() {
    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::currency_prize(1, "10 Coins", 10, 100.0));
    let jackpot = fixtures::currency_prize(2, "Jackpot", 1_000, 0.0);
    store.insert_prize(jackpot.clone());
    let user = UserId::new();
    store.set_balance(user, 2, 0);
    let grant = store.assign_forced_win(user, jackpot.id, Some(1), None, fixtures::epoch());

    let engine = engine_with(&store, vec![0.5]);
    let first = engine.draw(user).await.expect("first draw");
    let second = engine.draw(user).await.expect("second draw");

    assert_eq!(first.prize.id, jackpot.id);
    assert!(first.forced);
    assert_eq!(first.remaining_currency, 1_000);
    assert_eq!(second.prize.name, "10 Coins");
    assert!(!second.forced);

    let state = store.forced_win(grant).expect("grant");
    assert_eq!(state.use_count, 1);
    assert!(!state.active);
    assert_eq!(store.history().iter().filter(|r| r.forced).count(), 1);
}

#[tokio::test]
async fn newest_forced_win_takes_precedence() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    store.set_balance(user, 1, 0);
    store.assign_forced_win(user, PrizeId(1), None, None, fixtures::epoch());
    store.assign_forced_win(
        user,
        PrizeId(2),
        None,
        None,
        fixtures::epoch() + Duration::minutes(5),
    );

    let receipt = engine_with(&store, vec![0.0]).draw(user).await.expect("draw");

    assert_eq!(receipt.prize.name, "2 Tickets");
    assert!(receipt.forced);
}

#[tokio::test]
async fn forced_win_for_inactive_prize_still_applies() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let retired = fixtures::inactive(fixtures::currency_prize(9, "Retired Jackpot", 500, 1.0));
    store.insert_prize(retired.clone());
    let user = UserId::new();
    store.set_balance(user, 1, 0);
    store.assign_forced_win(user, retired.id, Some(1), None, fixtures::epoch());

    let receipt = engine_with(&store, vec![0.2]).draw(user).await.expect("draw");

    assert_eq!(receipt.prize.id, retired.id);
    assert!(receipt.forced);
}

#[tokio::test]
async fn forced_win_for_missing_prize_falls_back_to_weighted() {
    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::currency_prize(1, "100 Coins", 100, 1.0));
    let user = UserId::new();
    store.set_balance(user, 1, 0);
    let grant = store.assign_forced_win(user, PrizeId(999), Some(1), None, fixtures::epoch());

    let receipt = engine_with(&store, vec![0.5]).draw(user).await.expect("draw");

    assert_eq!(receipt.prize.name, "100 Coins");
    assert!(!receipt.forced);
    assert_eq!(store.balances_of(user).tickets, 0);

    let state = store.forced_win(grant).expect("grant");
    assert_eq!(state.use_count, 0);
    assert!(state.active);
    assert!(store.history().iter().all(|r| !r.forced));
}

#[tokio::test]
async fn expired_forced_win_is_ignored() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    store.set_balance(user, 1, 0);
    let expired = test_clock().now() - Duration::minutes(1);
    store.assign_forced_win(
        user,
        PrizeId(2),
        None,
        Some(expired),
        fixtures::epoch(),
    );

    let receipt = engine_with(&store, vec![0.2]).draw(user).await.expect("draw");

    assert_eq!(receipt.prize.name, "100 Coins");
    assert!(!receipt.forced);
}

#[tokio::test]
async fn disabled_wheel_refuses_before_any_change() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    store.set_balance(user, 3, 0);
    store.set_settings(SpinSettings {
        ticket_cost: 1,
        enabled: false,
    });

    let result = engine_with(&store, vec![0.2]).draw(user).await;

    assert_eq!(result, Err(DrawError::FeatureDisabled));
    assert_eq!(store.balances_of(user).tickets, 3);
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn settings_row_sets_ticket_cost() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    store.set_balance(user, 5, 0);
    store.set_settings(SpinSettings {
        ticket_cost: 3,
        enabled: true,
    });

    let receipt = engine_with(&store, vec![0.2]).draw(user).await.expect("draw");
    assert_eq!(receipt.remaining_tickets, 2);

    let refused = engine_with(&store, vec![0.2]).draw(user).await;
    assert_eq!(refused, Err(DrawError::InsufficientBalance));
    assert_eq!(store.balances_of(user).tickets, 2);
}

#[tokio::test]
async fn zero_cost_draw_succeeds_without_balance() {
    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::nothing_prize(1, 1.0));
    store.set_settings(SpinSettings {
        ticket_cost: 0,
        enabled: true,
    });

    let receipt = engine_with(&store, vec![0.5])
        .draw(UserId::new())
        .await
        .expect("draw");
    assert_eq!(receipt.remaining_tickets, 0);
}

#[tokio::test]
async fn empty_catalog_never_charges() {
    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::inactive(fixtures::currency_prize(1, "Gone", 10, 1.0)));
    let user = UserId::new();
    store.set_balance(user, 3, 0);
    let grant = store.grant_free_spins(user, 1, None, fixtures::epoch());

    let result = engine_with(&store, vec![0.2]).draw(user).await;

    assert_eq!(result, Err(DrawError::NoActivePrizes));
    assert_eq!(store.balances_of(user).tickets, 3);
    assert_eq!(store.free_spin(grant).expect("grant").spins_remaining, 1);
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn insufficient_balance_changes_nothing() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();

    let result = engine_with(&store, vec![0.2]).draw(user).await;

    assert_eq!(result, Err(DrawError::InsufficientBalance));
    assert_eq!(store.balances_of(user).tickets, 0);
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn settlement_failure_rolls_back_funding() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    store.set_balance(user, 1, 0);
    let grant = store.assign_forced_win(
        user,
        PrizeId(1),
        Some(1),
        None,
        fixtures::epoch(),
    );
    store.fail_next_history_append();

    let result = engine_with(&store, vec![0.2]).draw(user).await;

    assert!(matches!(result, Err(DrawError::DatabaseError(_))));
    assert_eq!(store.balances_of(user).tickets, 1);
    assert_eq!(store.balances_of(user).currency, 0);
    let state = store.forced_win(grant).expect("grant");
    assert_eq!(state.use_count, 0);
    assert!(state.active);
    assert!(store.history().is_empty());

    // The next attempt succeeds and consumes the grant.
    let receipt = engine_with(&store, vec![0.2]).draw(user).await.expect("retry");
    assert!(receipt.forced);
    assert_eq!(store.balances_of(user).currency, 100);
}

#[tokio::test]
async fn item_and_nothing_are_recorded_unclaimed() {
    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::prize(1, "Mystery Box", Reward::Item(7), 1.0));
    store.insert_prize(fixtures::nothing_prize(2, 1.0));
    let user = UserId::new();
    store.set_balance(user, 2, 40);

    let engine = engine_with(&store, vec![0.1, 0.9]);
    let item = engine.draw(user).await.expect("item draw");
    let nothing = engine.draw(user).await.expect("nothing draw");

    assert_eq!(item.prize.name, "Mystery Box");
    assert_eq!(item.remaining_currency, 40);
    assert_eq!(nothing.message, "Better luck next time!");
    assert_eq!(nothing.remaining_tickets, 0);

    let history = store.history();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.claim_status == ClaimStatus::Unclaimed));
    assert_eq!(store.balances_of(user).currency, 40);
}

#[tokio::test]
async fn every_completed_draw_is_recorded() {
    let store = InMemoryDrawStore::new();
    fifty_fifty(&store);
    let user = UserId::new();
    store.set_balance(user, 10, 0);

    let engine = engine_with(&store, vec![0.1, 0.6, 0.3, 0.8]);
    let mut completed = 0;
    for _ in 0..15 {
        if engine.draw(user).await.is_ok() {
            completed += 1;
        }
    }

    let history = engine
        .store()
        .history_for_user(user, 100)
        .await
        .expect("history");
    assert_eq!(history.len(), completed);
    assert!(history.windows(2).all(|w| w[0].id > w[1].id), "newest first");

    let stats = DrawStats::summarize(&store.history(), test_clock().now().date_naive());
    assert_eq!(usize::try_from(stats.total_draws).expect("fits"), completed);
    assert_eq!(stats.unique_users, 1);
}
