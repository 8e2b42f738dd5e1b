//! Recall quality rating on the SM-2 scale.
//!
//! - 0: complete blackout
//! - 1: incorrect, answered quickly
//! - 2: incorrect, but close
//! - 3: correct with serious difficulty
//! - 4: correct after hesitation
//! - 5: perfect response
use serde::Serialize;
use std::fmt;

/// A rating in `0..=5`. Every constructor clamps, so an out-of-range value
/// can never reach the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(0);
    pub const MAX: Quality = Quality(5);
    /// Lowest rating that still counts as recalled.
    pub const RECALL_THRESHOLD: u8 = 3;

    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX.0))
    }

    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX.0 as i64) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_recall(self) -> bool {
        self.0 >= Self::RECALL_THRESHOLD
    }
}

impl From<u8> for Quality {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<i32> for Quality {
    fn from(value: i32) -> Self {
        Self::clamped(value as i64)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
