//! # Spinwheel Testing
//!
//! Testing utilities for the spin wheel draw engine.
//!
//! This crate provides:
//! - Deterministic [`Clock`](spinwheel_core::Clock) and
//!   [`RandomSource`](spinwheel_core::RandomSource) implementations
//! - [`InMemoryDrawStore`]: a complete in-memory [`DrawStore`](spinwheel_core::DrawStore)
//! - Prize fixtures and proptest strategies
//!
//! ## Example
//!
//! ```ignore
//! use spinwheel_testing::{InMemoryDrawStore, ScriptedRandom, fixtures, test_clock};
//! use spinwheel_core::{DrawEngine, EngineConfig, UserId};
//!
//! #[tokio::test]
//! async fn test_draw() {
//!     let store = InMemoryDrawStore::new();
//!     store.insert_prize(fixtures::currency_prize(1, "100 Coins", 100, 1.0));
//!     let user = UserId::new();
//!     store.set_balance(user, 3, 0);
//!
//!     let engine = DrawEngine::new(
//!         store.clone(),
//!         ScriptedRandom::constant(0.2),
//!         test_clock(),
//!         EngineConfig::default(),
//!     );
//!     let receipt = engine.draw(user).await.expect("draw succeeds");
//!     assert_eq!(receipt.remaining_tickets, 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use spinwheel_core::environment::{Clock, RandomSource};

pub mod fixtures;
pub mod memory_store;
pub mod properties;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, RandomSource, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use spinwheel_testing::mocks::FixedClock;
    /// use spinwheel_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2);
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// A clock `days` days later.
        #[must_use]
        pub fn advanced_days(&self, days: i64) -> Self {
            Self::new(self.time + chrono::Duration::days(days))
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 12:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Random source that replays a fixed sequence of unit samples, cycling.
    ///
    /// An empty sequence always yields `0.0`.
    #[derive(Debug)]
    pub struct ScriptedRandom {
        samples: Vec<f64>,
        next: AtomicUsize,
    }

    impl ScriptedRandom {
        /// Replay `samples` in order, starting over at the end.
        #[must_use]
        pub fn new(samples: Vec<f64>) -> Self {
            Self {
                samples,
                next: AtomicUsize::new(0),
            }
        }

        /// Always yield `sample`.
        #[must_use]
        pub fn constant(sample: f64) -> Self {
            Self::new(vec![sample])
        }
    }

    impl RandomSource for ScriptedRandom {
        fn next_unit(&self) -> f64 {
            if self.samples.is_empty() {
                return 0.0;
            }
            let index = self.next.fetch_add(1, Ordering::Relaxed) % self.samples.len();
            self.samples[index]
        }
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`. Safe to call from every test; only the first call
/// installs the subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use memory_store::{InMemoryDrawStore, InMemoryTransaction};
pub use mocks::{FixedClock, ScriptedRandom, test_clock};
