//! Common Types and Constants
//!
//! Shared data structures used across all algorithm modules.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Easiness factor assigned to a freshly collected word
pub const DEFAULT_EASINESS: f64 = 2.5;

/// Lower bound of the easiness factor
pub const MIN_EASINESS: f64 = 1.3;

/// Lowest accepted recall quality
pub const MIN_QUALITY: u8 = 0;

/// Highest accepted recall quality
pub const MAX_QUALITY: u8 = 5;

/// Upper bound for any scheduled interval (100 years)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

// ==================== Errors ====================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QualityError {
    #[error("quality must be an integer between {MIN_QUALITY} and {MAX_QUALITY}, got {0}")]
    OutOfRange(i64),
    #[error("quality must be an integer between {MIN_QUALITY} and {MAX_QUALITY}, got {0}")]
    NotAnInteger(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid policy field `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl PolicyError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

// ==================== Review Types ====================

/// Recall quality reported for a single review.
///
/// 0 is a complete blackout, 5 a perfect answer. The review UI only sends
/// 1 / 3 / 5 but the full range is accepted so other callers can grade
/// more finely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quality(u8);

impl Quality {
    /// "Don't know" button
    pub const AGAIN: Quality = Quality(1);
    /// "Vague" button
    pub const HARD: Quality = Quality(3);
    /// "Know it" button
    pub const EASY: Quality = Quality(5);

    pub fn new(value: i64) -> Result<Self, QualityError> {
        if (MIN_QUALITY as i64..=MAX_QUALITY as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(QualityError::OutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Distance from a perfect answer, the `5 - q` term of SM-2
    pub fn deficit(self) -> f64 {
        f64::from(MAX_QUALITY - self.0)
    }
}

impl TryFrom<i64> for Quality {
    type Error = QualityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for i64 {
    fn from(q: Quality) -> Self {
        i64::from(q.0)
    }
}

/// Scheduling-relevant part of a word memory record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    /// Interval growth multiplier, never below the policy floor
    pub easiness_factor: f64,
    /// Days until the next review
    pub interval_days: u32,
    /// Consecutive successful reviews since the last lapse
    pub repetitions: u32,
    /// Total number of lapses
    pub lapse_count: u32,
}

impl MemoryState {
    /// State of a word that has just been added to a collection
    pub fn fresh(initial_easiness: f64) -> Self {
        Self {
            easiness_factor: initial_easiness,
            interval_days: 0,
            repetitions: 0,
            lapse_count: 0,
        }
    }
}

impl Default for MemoryState {
    fn default() -> Self {
        Self::fresh(DEFAULT_EASINESS)
    }
}

/// Count of events on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: chrono::NaiveDate,
    pub count: u32,
}
