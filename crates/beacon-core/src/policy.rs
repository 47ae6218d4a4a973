//! Token policy selection (sequential-persisted / random).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// How the low 16 bits of a token are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPolicy {
    /// Monotonic 16-bit counter, persisted across restarts in a side file.
    #[default]
    Sequential,
    /// Random 16 bits, redrawn on collision within the current seconds
    /// bucket.
    Random,
}

/// Error for unrecognized policy names.
#[derive(Debug, Error)]
#[error("unknown token policy {0:?} (expected \"sequential\" or \"random\")")]
pub struct ParsePolicyError(String);

impl FromStr for TokenPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("sequential") {
            Ok(TokenPolicy::Sequential)
        } else if s.eq_ignore_ascii_case("random") {
            Ok(TokenPolicy::Random)
        } else {
            Err(ParsePolicyError(s.to_string()))
        }
    }
}

impl fmt::Display for TokenPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenPolicy::Sequential => f.write_str("sequential"),
            TokenPolicy::Random => f.write_str("random"),
        }
    }
}
