//! Token layout: the 32-bit value pushed to clients.
//!
//! High 16 bits carry the seconds-since-local-midnight bucket, low 16 bits
//! carry a per-policy disambiguator (a persisted counter or a random draw).

use std::fmt;

/// A generated client token.
///
/// The wire form is the plain decimal rendering of the packed value,
/// followed by a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(u32);

impl Token {
    /// Pack a seconds-since-midnight value and a low 16-bit component.
    ///
    /// A day holds 86_400 seconds, one bit more than the shift leaves room
    /// for: the top bit of `seconds` is dropped, so second `N` and second
    /// `N + 65_536` land in the same bucket.
    pub fn compose(seconds: u32, low: u16) -> Self {
        Token((seconds << 16) | u32::from(low))
    }

    /// The packed 32-bit value.
    pub fn value(self) -> u32 {
        self.0
    }

    /// The (already truncated) seconds bucket carried in the high bits.
    pub fn seconds_bucket(self) -> u32 {
        self.0 >> 16
    }

    /// The per-policy low 16 bits.
    pub fn low_bits(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
