//! Wall-clock source for the token's seconds bucket.

use chrono::{Local, Timelike};

/// Supplies seconds elapsed since local midnight (0..86_400).
///
/// Generators are generic over this so tests can pin or step time.
pub trait DayClock {
    fn seconds_since_midnight(&self) -> u32;
}

/// System clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalWallClock;

impl DayClock for LocalWallClock {
    fn seconds_since_midnight(&self) -> u32 {
        Local::now().time().num_seconds_from_midnight()
    }
}
