//! beacon-core
//!
//! Pure token-generation logic:
//! - token layout (seconds bucket + low bits)
//! - day clock abstraction
//! - generation policies (sequential-persisted, random)
//! - persistent counter store

pub mod clock;
pub mod generator;
pub mod policy;
pub mod store;
pub mod token;

pub use clock::{DayClock, LocalWallClock};
pub use generator::TokenGenerator;
pub use policy::{ParsePolicyError, TokenPolicy};
pub use store::CounterStore;
pub use token::Token;
