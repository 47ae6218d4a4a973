//! Persistent counter for the sequential policy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Side file holding the last-issued low-16 counter as decimal text.
///
/// Read once at startup; rewritten after every issuance. Absent or
/// unparseable contents load as 0.
#[derive(Debug)]
pub struct CounterStore {
    path: PathBuf,
}

impl CounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CounterStore { path: path.into() }
    }

    /// Load the stored counter, defaulting to 0.
    ///
    /// Values wider than 16 bits are masked down, matching how the counter
    /// is folded into the token.
    pub fn load(&self) -> u16 {
        match fs::read_to_string(&self.path) {
            Ok(text) => text
                .trim()
                .parse::<u32>()
                .map(|v| (v & 0xFFFF) as u16)
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Overwrite the stored counter.
    pub fn save(&self, value: u16) -> io::Result<()> {
        fs::write(&self.path, value.to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
