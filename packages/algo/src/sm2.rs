//! SM-2 Scheduling
//!
//! Applies one review outcome to a memory state:
//!
//! ```text
//! EF' = max(EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), 1.3)
//! q < 3  -> repetitions' = 0, interval' = 1
//! q >= 3 -> repetitions' = repetitions + 1
//!           interval' = 1, 6, then round(interval * EF')
//! ```
//!
//! Every constant lives in [`SchedulingPolicy`] so deployments can tune them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    MemoryState, PolicyError, Quality, DEFAULT_EASINESS, MAX_INTERVAL_DAYS, MAX_QUALITY,
    MIN_EASINESS,
};

/// Interval after a lapse. Fixed so a lapsed word is always due the next day.
pub const LAPSE_INTERVAL_DAYS: u32 = 1;

/// Tunable SM-2 constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingPolicy {
    pub initial_easiness: f64,
    pub min_easiness: f64,
    /// Constant term of the EF update (0.1)
    pub ef_base: f64,
    /// Linear term of the EF update (0.08)
    pub ef_linear: f64,
    /// Quadratic term of the EF update (0.02)
    pub ef_quadratic: f64,
    pub first_interval_days: u32,
    pub second_interval_days: u32,
    /// Lowest quality that counts as remembered
    pub pass_threshold: u8,
    pub max_interval_days: u32,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            initial_easiness: DEFAULT_EASINESS,
            min_easiness: MIN_EASINESS,
            ef_base: 0.1,
            ef_linear: 0.08,
            ef_quadratic: 0.02,
            first_interval_days: 1,
            second_interval_days: 6,
            pass_threshold: 3,
            max_interval_days: MAX_INTERVAL_DAYS,
        }
    }
}

impl SchedulingPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (field, value) in [
            ("initialEasiness", self.initial_easiness),
            ("minEasiness", self.min_easiness),
            ("efBase", self.ef_base),
            ("efLinear", self.ef_linear),
            ("efQuadratic", self.ef_quadratic),
        ] {
            if !value.is_finite() {
                return Err(PolicyError::invalid(field, "must be a finite number"));
            }
        }
        if self.min_easiness <= 0.0 {
            return Err(PolicyError::invalid("minEasiness", "must be positive"));
        }
        if self.initial_easiness < self.min_easiness {
            return Err(PolicyError::invalid(
                "initialEasiness",
                "must not be below minEasiness",
            ));
        }
        if self.first_interval_days == 0 {
            return Err(PolicyError::invalid("firstIntervalDays", "must be at least 1"));
        }
        if self.second_interval_days < self.first_interval_days {
            return Err(PolicyError::invalid(
                "secondIntervalDays",
                "must not be shorter than firstIntervalDays",
            ));
        }
        if self.pass_threshold == 0 || self.pass_threshold > MAX_QUALITY {
            return Err(PolicyError::invalid(
                "passThreshold",
                format!("must be between 1 and {MAX_QUALITY}"),
            ));
        }
        if self.max_interval_days < self.second_interval_days {
            return Err(PolicyError::invalid(
                "maxIntervalDays",
                "must not be shorter than secondIntervalDays",
            ));
        }
        Ok(())
    }

    pub fn is_lapse(&self, quality: Quality) -> bool {
        quality.value() < self.pass_threshold
    }

    /// EF update, clamped to the floor. A corrupt (NaN) input collapses to the floor.
    pub fn next_easiness(&self, easiness: f64, quality: Quality) -> f64 {
        let d = quality.deficit();
        let next = easiness + (self.ef_base - d * (self.ef_linear + d * self.ef_quadratic));
        next.max(self.min_easiness)
    }

    fn next_interval(&self, repetitions: u32, interval: u32, easiness: f64) -> u32 {
        let days = match repetitions {
            1 => self.first_interval_days,
            2 => self.second_interval_days,
            _ => {
                let grown = (f64::from(interval) * easiness).round();
                if grown >= f64::from(self.max_interval_days) {
                    self.max_interval_days
                } else {
                    grown as u32
                }
            }
        };
        days.clamp(1, self.max_interval_days)
    }
}

/// Outcome of applying one review
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewTransition {
    pub previous: MemoryState,
    pub state: MemoryState,
    pub lapsed: bool,
    pub reviewed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

/// Run the SM-2 update for `quality` at `now`.
pub fn apply_review(
    state: &MemoryState,
    quality: Quality,
    policy: &SchedulingPolicy,
    now: DateTime<Utc>,
) -> ReviewTransition {
    let easiness_factor = policy.next_easiness(state.easiness_factor, quality);
    let lapsed = policy.is_lapse(quality);

    let (repetitions, interval_days, lapse_count) = if lapsed {
        (0, LAPSE_INTERVAL_DAYS, state.lapse_count.saturating_add(1))
    } else {
        let repetitions = state.repetitions.saturating_add(1);
        let interval = policy.next_interval(repetitions, state.interval_days, easiness_factor);
        (repetitions, interval, state.lapse_count)
    };

    let next = MemoryState {
        easiness_factor,
        interval_days,
        repetitions,
        lapse_count,
    };

    ReviewTransition {
        previous: *state,
        state: next,
        lapsed,
        reviewed_at: now,
        due_at: now + Duration::days(i64::from(interval_days)),
    }
}

/// Intervals each review button would produce, without committing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntervalPreview {
    pub again: u32,
    pub hard: u32,
    pub easy: u32,
}

pub fn preview_intervals(state: &MemoryState, policy: &SchedulingPolicy) -> IntervalPreview {
    let now = Utc::now();
    let interval = |q: Quality| apply_review(state, q, policy, now).state.interval_days;
    IntervalPreview {
        again: interval(Quality::AGAIN),
        hard: interval(Quality::HARD),
        easy: interval(Quality::EASY),
    }
}
