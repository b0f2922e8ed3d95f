//! Streak and Daily Activity
//!
//! Calendar-day helpers over review history. Days are already local to the
//! learner; time zone conversion is the caller's job.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};

use crate::types::DayCount;

/// Default bound on how far back a streak is walked
pub const DEFAULT_STREAK_LOOKBACK_DAYS: u32 = 365;

/// Consecutive active days ending today.
///
/// A day without activity today yields 0, whatever happened before. The walk
/// stops after `max_lookback` days, so longer streaks are reported as the cap.
pub fn streak_days(active_days: &BTreeSet<NaiveDate>, today: NaiveDate, max_lookback: u32) -> u32 {
    let mut streak = 0;
    let mut day = today;

    while streak < max_lookback && active_days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }

    streak
}

/// Per-day counts for the `span` days ending at `today`, oldest first.
///
/// Days outside the window are ignored; days inside it with no activity are
/// reported with an explicit zero.
pub fn daily_counts<I>(days: I, today: NaiveDate, span: u32) -> Vec<DayCount>
where
    I: IntoIterator<Item = NaiveDate>,
{
    if span == 0 {
        return Vec::new();
    }
    let first = today - Duration::days(i64::from(span) - 1);

    let mut buckets: BTreeMap<NaiveDate, u32> = (0..span)
        .map(|offset| (first + Duration::days(i64::from(offset)), 0))
        .collect();

    for day in days {
        if let Some(count) = buckets.get_mut(&day) {
            *count += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(date, count)| DayCount { date, count })
        .collect()
}

/// Trailing seven days ending today
pub fn weekly_counts<I>(days: I, today: NaiveDate) -> Vec<DayCount>
where
    I: IntoIterator<Item = NaiveDate>,
{
    daily_counts(days, today, 7)
}
