//! Daily bonus claims against the in-memory store.

#![allow(clippy::expect_used)] // Test code can use expect

use chrono::{Days, NaiveDate};
use spinwheel_core::{Clock, DailyClaimConfig, DailyClaimService, DrawError, EngineConfig, UserId};
use spinwheel_testing::{FixedClock, InMemoryDrawStore, test_clock};

type TestService = DailyClaimService<InMemoryDrawStore, FixedClock>;

fn service(store: &InMemoryDrawStore, clock: FixedClock) -> TestService {
    DailyClaimService::new(store.clone(), clock, &EngineConfig::default())
}

fn today() -> NaiveDate {
    test_clock().now().date_naive()
}

fn days_ago(days: u64) -> NaiveDate {
    today().checked_sub_days(Days::new(days)).expect("valid date")
}

#[tokio::test]
async fn test_first_claim_grants_base_tickets() {
    let store = InMemoryDrawStore::new();
    let user = UserId::new();
    store.set_balance(user, 4, 0);

    let receipt = service(&store, test_clock()).claim(user).await.expect("claim");

    assert_eq!(receipt.tickets_granted, 1);
    assert_eq!(receipt.streak, 1);
    assert_eq!(receipt.ticket_balance, 5);
    assert_eq!(receipt.next_claim_at.to_rfc3339(), "2025-01-02T00:00:00+00:00");
    assert_eq!(store.balances_of(user).tickets, 5);
}

#[tokio::test]
async fn test_second_claim_same_day_is_refused() {
    let store = InMemoryDrawStore::new();
    let user = UserId::new();
    let daily = service(&store, test_clock());

    daily.claim(user).await.expect("first claim");
    let second = daily.claim(user).await;

    assert_eq!(second, Err(DrawError::AlreadyClaimed));
    assert_eq!(store.balances_of(user).tickets, 1);
}

#[tokio::test]
async fn test_streak_tiers() {
    let store = InMemoryDrawStore::new();
    let user = UserId::new();
    store.record_claim(user, days_ago(2), 1);
    store.record_claim(user, days_ago(1), 1);

    let receipt = service(&store, test_clock()).claim(user).await.expect("claim");
    assert_eq!(receipt.streak, 3);
    assert_eq!(receipt.tickets_granted, 2);

    let other = UserId::new();
    for days in 1..=6 {
        store.record_claim(other, days_ago(days), 1);
    }
    let receipt = service(&store, test_clock()).claim(other).await.expect("claim");
    assert_eq!(receipt.streak, 7);
    assert_eq!(receipt.tickets_granted, 3);
}

#[tokio::test]
async fn test_missed_day_resets_streak() {
    let store = InMemoryDrawStore::new();
    let user = UserId::new();
    store.record_claim(user, days_ago(4), 1);
    store.record_claim(user, days_ago(3), 1);
    store.record_claim(user, days_ago(2), 1);

    let receipt = service(&store, test_clock()).claim(user).await.expect("claim");

    assert_eq!(receipt.streak, 1);
    assert_eq!(receipt.tickets_granted, 1);
}

#[tokio::test]
async fn test_consecutive_days_build_streak() {
    let store = InMemoryDrawStore::new();
    let user = UserId::new();
    let clock = test_clock();

    for day in 0..3 {
        let receipt = service(&store, clock.advanced_days(day))
            .claim(user)
            .await
            .expect("claim");
        assert_eq!(i64::from(receipt.streak), day + 1);
    }
    assert_eq!(store.balances_of(user).tickets, 1 + 1 + 2);
}

#[tokio::test]
async fn test_status_before_and_after_claim() {
    let store = InMemoryDrawStore::new();
    let user = UserId::new();
    store.record_claim(user, days_ago(1), 1);
    store.record_claim(user, days_ago(2), 1);
    let daily = service(&store, test_clock());

    let before = daily.status(user).await.expect("status");
    assert!(before.can_claim);
    assert!(!before.claimed_today);
    assert_eq!(before.current_streak, 2);
    assert_eq!(before.next_claim_tickets, 2);
    assert_eq!(before.next_claim_at.to_rfc3339(), "2025-01-01T00:00:00+00:00");

    daily.claim(user).await.expect("claim");

    let after = daily.status(user).await.expect("status");
    assert!(!after.can_claim);
    assert!(after.claimed_today);
    assert_eq!(after.current_streak, 3);
    assert_eq!(after.next_claim_tickets, 2);
    assert_eq!(after.next_claim_at.to_rfc3339(), "2025-01-02T00:00:00+00:00");
}

#[tokio::test]
async fn test_status_does_not_credit() {
    let store = InMemoryDrawStore::new();
    let user = UserId::new();

    service(&store, test_clock()).status(user).await.expect("status");

    assert_eq!(store.balances_of(user).tickets, 0);
}

#[tokio::test]
async fn test_engine_config_sets_bonus_amounts() {
    let store = InMemoryDrawStore::new();
    let user = UserId::new();
    store.record_claim(user, days_ago(1), 5);
    let config = EngineConfig::new().with_daily_claim(DailyClaimConfig::new(5).with_tier(2, 8));

    let receipt = DailyClaimService::new(store.clone(), test_clock(), &config)
        .claim(user)
        .await
        .expect("claim");

    assert_eq!(receipt.streak, 2);
    assert_eq!(receipt.tickets_granted, 8);
    assert_eq!(store.balances_of(user).tickets, 8);
}
