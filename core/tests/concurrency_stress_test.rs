//! Concurrency stress tests for last-ticket scenarios.
//!
//! These tests verify that under concurrent load a balance is never spent
//! twice and every completed draw leaves exactly one history record.
//!
//! Run with: `cargo test --test concurrency_stress_test -- --nocapture`

#![allow(clippy::expect_used)] // Test code can use expect

use futures::future::join_all;
use spinwheel_core::{DrawEngine, DrawError, DrawReceipt, EngineConfig, Result, UserId};
use spinwheel_testing::{FixedClock, InMemoryDrawStore, ScriptedRandom, fixtures, test_clock};
use std::sync::Arc;

type SharedEngine = Arc<DrawEngine<InMemoryDrawStore, ScriptedRandom, FixedClock>>;

fn shared_engine(store: &InMemoryDrawStore) -> SharedEngine {
    Arc::new(DrawEngine::new(
        store.clone(),
        ScriptedRandom::new(vec![0.05, 0.35, 0.65, 0.95]),
        test_clock(),
        EngineConfig::default(),
    ))
}

async fn draw_concurrently(engine: &SharedEngine, users: &[UserId]) -> Vec<Result<DrawReceipt>> {
    let handles: Vec<_> = users
        .iter()
        .map(|user| {
            let engine = Arc::clone(engine);
            let user = *user;
            tokio::spawn(async move { engine.draw(user).await })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("draw task panicked"))
        .collect()
}

/// Two concurrent draws for one remaining ticket: one wins, one is refused.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_ticket_two_requests() {
    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::nothing_prize(1, 1.0));
    let user = UserId::new();
    store.set_balance(user, 1, 0);

    let results = draw_concurrently(&shared_engine(&store), &[user, user]).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(DrawError::InsufficientBalance)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(refused, 1);
    assert_eq!(store.balances_of(user).tickets, 0);
    assert_eq!(store.history().len(), 1);
}

/// 100 concurrent draws against 10 tickets.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_ten_tickets_100_requests() {
    println!("Concurrency stress test: 100 concurrent draws for 10 tickets");

    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::currency_prize(1, "5 Coins", 5, 1.0));
    store.insert_prize(fixtures::nothing_prize(2, 1.0));
    let user = UserId::new();
    store.set_balance(user, 10, 0);

    let results = draw_concurrently(&shared_engine(&store), &[user; 100]).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(DrawError::InsufficientBalance)))
        .count();
    println!("  successes: {successes}, refused: {refused}");

    assert_eq!(successes, 10);
    assert_eq!(refused, 90);
    assert_eq!(store.balances_of(user).tickets, 0);
    assert_eq!(store.history().len(), successes);

    let awarded: u64 = store.history().iter().map(|r| r.prize_value).sum();
    assert_eq!(store.balances_of(user).currency, awarded);
}

/// Draws for different users never interfere.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_independent_users() {
    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::nothing_prize(1, 1.0));
    let users: Vec<UserId> = (0..50).map(|_| UserId::new()).collect();
    for user in &users {
        store.set_balance(*user, 1, 0);
    }

    let results = draw_concurrently(&shared_engine(&store), &users).await;

    assert!(results.iter().all(Result::is_ok));
    assert!(users.iter().all(|u| store.balances_of(*u).tickets == 0));
    assert_eq!(store.history().len(), users.len());
}

/// A free spin and a ticket: two concurrent draws both succeed, each funded once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_free_spin_consumed_once() {
    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::nothing_prize(1, 1.0));
    let user = UserId::new();
    store.set_balance(user, 1, 0);
    let grant = store.grant_free_spins(user, 1, None, fixtures::epoch());

    let results = draw_concurrently(&shared_engine(&store), &[user, user, user]).await;

    let receipts: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts.iter().filter(|r| r.funded_by_grant).count(), 1);
    assert_eq!(store.free_spin(grant).expect("grant").spins_remaining, 0);
    assert_eq!(store.balances_of(user).tickets, 0);
}

/// A single-use forced win raced by four funded draws decides exactly one of them.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_use_forced_win_applied_once() {
    let store = InMemoryDrawStore::new();
    store.insert_prize(fixtures::currency_prize(1, "5 Coins", 5, 1.0));
    let jackpot = fixtures::currency_prize(2, "Jackpot", 1_000, 0.0);
    store.insert_prize(jackpot.clone());
    let user = UserId::new();
    store.set_balance(user, 4, 0);
    let grant = store.assign_forced_win(user, jackpot.id, Some(1), None, fixtures::epoch());

    let results = draw_concurrently(&shared_engine(&store), &[user; 4]).await;

    let receipts: Vec<DrawReceipt> = results
        .into_iter()
        .map(|r| r.expect("funded draw succeeds"))
        .collect();
    assert_eq!(receipts.iter().filter(|r| r.forced).count(), 1);
    assert_eq!(receipts.iter().filter(|r| r.prize.id == jackpot.id).count(), 1);
    assert_eq!(store.history().len(), 4);
    assert_eq!(store.history().iter().filter(|r| r.forced).count(), 1);
    assert_eq!(store.balances_of(user).tickets, 0);

    let state = store.forced_win(grant).expect("grant");
    assert_eq!(state.use_count, 1);
    assert!(!state.active);
}
