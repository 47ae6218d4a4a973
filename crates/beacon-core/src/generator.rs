//! Token generation: one lock around per-policy state.

use std::collections::HashSet;

use parking_lot::Mutex;
use rand::Rng;

use crate::clock::{DayClock, LocalWallClock};
use crate::policy::TokenPolicy;
use crate::store::CounterStore;
use crate::token::Token;

/// Thread-safe token generator.
///
/// All callers funnel through one mutex, so the read-increment-store
/// sequence of the sequential policy and the draw-check-insert sequence of
/// the random policy never interleave.
pub struct TokenGenerator<C: DayClock = LocalWallClock> {
    clock: C,
    state: Mutex<PolicyState>,
}

enum PolicyState {
    Sequential {
        last: u16,
        store: CounterStore,
    },
    Random {
        /// Seconds bucket the `issued` set belongs to.
        bucket: u32,
        /// Low 16-bit values issued within `bucket`.
        issued: HashSet<u16>,
    },
}

impl TokenGenerator<LocalWallClock> {
    /// Sequential-persisted generator; the counter resumes from `store`
    /// (0 when the file is absent or unreadable).
    pub fn sequential(store: CounterStore) -> Self {
        Self::sequential_with_clock(LocalWallClock, store)
    }

    /// Random generator with per-bucket collision avoidance.
    pub fn random() -> Self {
        Self::random_with_clock(LocalWallClock)
    }

    /// Build the generator named by `policy`; `store` is only consulted by
    /// the sequential policy.
    pub fn from_policy(policy: TokenPolicy, store: CounterStore) -> Self {
        match policy {
            TokenPolicy::Sequential => Self::sequential(store),
            TokenPolicy::Random => Self::random(),
        }
    }
}

impl<C: DayClock> TokenGenerator<C> {
    pub fn sequential_with_clock(clock: C, store: CounterStore) -> Self {
        let last = store.load();
        TokenGenerator {
            clock,
            state: Mutex::new(PolicyState::Sequential { last, store }),
        }
    }

    pub fn random_with_clock(clock: C) -> Self {
        TokenGenerator {
            clock,
            state: Mutex::new(PolicyState::Random {
                bucket: 0,
                issued: HashSet::new(),
            }),
        }
    }

    /// Produce the next token.
    ///
    /// Sequential: the new counter value is persisted before this returns.
    /// A failed write is logged and the token is issued anyway; a degraded
    /// side file weakens restart uniqueness, not delivery.
    pub fn generate(&self) -> Token {
        let seconds = self.clock.seconds_since_midnight();
        let mut state = self.state.lock();

        match &mut *state {
            PolicyState::Sequential { last, store } => {
                let next = last.wrapping_add(1);
                *last = next;
                if let Err(e) = store.save(next) {
                    tracing::warn!(
                        path = %store.path().display(),
                        error = %e,
                        "failed to persist token counter"
                    );
                }
                Token::compose(seconds, next)
            }
            PolicyState::Random { bucket, issued } => {
                if *bucket != seconds {
                    *bucket = seconds;
                    issued.clear();
                }
                let mut rng = rand::thread_rng();
                // Redraw until the low bits are fresh for this bucket. The
                // set holds at most 65_536 entries and is cleared every
                // second, so the loop terminates unless a single second
                // issues the entire 16-bit space.
                loop {
                    let low: u16 = rng.gen();
                    if issued.insert(low) {
                        return Token::compose(seconds, low);
                    }
                }
            }
        }
    }
}
