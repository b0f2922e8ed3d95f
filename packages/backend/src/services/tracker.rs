use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use recall_algo::{streak_days, MasteryPolicy, MasteryTransition, MemoryState};
use sqlx::SqlitePool;

use crate::db::operations::list_event_times;
use crate::services::calendar::UserCalendar;
use crate::services::review::ReviewError;

/// True only when this review moved the word into the mastered set.
pub fn mastery_credit(policy: &MasteryPolicy, before: &MemoryState, after: &MemoryState) -> bool {
    matches!(policy.transition(before, after), MasteryTransition::Gained)
}

/// Local days (inside the window) on which the user reviewed anything
pub async fn active_days(
    pool: &SqlitePool,
    user_id: &str,
    calendar: &UserCalendar,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<NaiveDate>, ReviewError> {
    let (start, end) = calendar.span_bounds(first, last);
    let times = list_event_times(pool, user_id, start, end).await?;
    Ok(times.into_iter().map(|at| calendar.local_date(at)).collect())
}

pub async fn current_streak(
    pool: &SqlitePool,
    user_id: &str,
    calendar: &UserCalendar,
    now: DateTime<Utc>,
    max_lookback: u32,
) -> Result<u32, ReviewError> {
    if max_lookback == 0 {
        return Ok(0);
    }
    let today = calendar.today(now);
    let first = today
        .checked_sub_signed(Duration::days(i64::from(max_lookback) - 1))
        .unwrap_or(NaiveDate::MIN);

    let days: BTreeSet<NaiveDate> = active_days(pool, user_id, calendar, first, today)
        .await?
        .into_iter()
        .collect();

    Ok(streak_days(&days, today, max_lookback))
}
