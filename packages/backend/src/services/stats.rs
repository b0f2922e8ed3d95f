use chrono::{DateTime, Duration, NaiveDate, Utc};
use recall_algo::{weekly_counts, DayCount};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::EngineConfig;
use crate::db::operations::{
    count_created_between, count_due_reviews, count_mastered, count_mastery_credits_between,
    count_reviewed_words_between, count_unreviewed_created_between,
};
use crate::services::calendar::UserCalendar;
use crate::services::collection::{recent_words, RecordView};
use crate::services::review::ReviewError;
use crate::services::{settings, tracker};

const RECENT_WORDS_LIMIT: i64 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub today_due: i64,
    pub today_new: i64,
    pub total_mastered: i64,
    pub streak_days: u32,
    pub recent_words: Vec<RecordView>,
    pub weekly_stats: Vec<DayCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_due: i64,
    pub reviewed: i64,
    pub new_words: i64,
    pub mastered_today: i64,
}

/// Activity of one local day, always derived from events and records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCounter {
    pub date: NaiveDate,
    pub reviewed_count: i64,
    pub new_count: i64,
    pub mastered_count: i64,
}

pub async fn daily_counter(
    pool: &SqlitePool,
    user_id: &str,
    calendar: &UserCalendar,
    date: NaiveDate,
) -> Result<DailyCounter, ReviewError> {
    let (start, end) = calendar.day_bounds(date);
    Ok(DailyCounter {
        date,
        reviewed_count: count_reviewed_words_between(pool, user_id, start, end).await?,
        new_count: count_created_between(pool, user_id, start, end).await?,
        mastered_count: count_mastery_credits_between(pool, user_id, start, end).await?,
    })
}

/// Counter for a local day given as `YYYY-MM-DD`, or today when absent.
pub async fn daily_counter_for(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<DailyCounter, ReviewError> {
    let resolved = settings::resolve(pool, engine, user_id).await?;
    let date = date.unwrap_or_else(|| resolved.calendar.today(now));
    daily_counter(pool, user_id, &resolved.calendar, date).await
}

pub async fn get_review_stats(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<ReviewStats, ReviewError> {
    let resolved = settings::resolve(pool, engine, user_id).await?;
    let today = resolved.calendar.today(now);
    let counter = daily_counter(pool, user_id, &resolved.calendar, today).await?;

    Ok(ReviewStats {
        total_due: count_due_reviews(pool, user_id, now).await?,
        reviewed: counter.reviewed_count,
        new_words: counter.new_count,
        mastered_today: counter.mastered_count,
    })
}

pub async fn get_dashboard(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Dashboard, ReviewError> {
    let resolved = settings::resolve(pool, engine, user_id).await?;
    let calendar = resolved.calendar;
    let today = calendar.today(now);
    let (today_start, today_end) = calendar.day_bounds(today);

    let week_start = today - Duration::days(6);
    let week_days = tracker::active_days(pool, user_id, &calendar, week_start, today).await?;

    let dashboard = Dashboard {
        today_due: count_due_reviews(pool, user_id, now).await?,
        today_new: count_unreviewed_created_between(pool, user_id, today_start, today_end).await?,
        total_mastered: count_mastered(pool, user_id, &engine.mastery).await?,
        streak_days: tracker::current_streak(
            pool,
            user_id,
            &calendar,
            now,
            engine.streak_lookback_days,
        )
        .await?,
        recent_words: recent_words(pool, user_id, RECENT_WORDS_LIMIT).await?,
        weekly_stats: weekly_counts(week_days, today),
    };

    tracing::debug!(
        user_id,
        today_due = dashboard.today_due,
        streak = dashboard.streak_days,
        "dashboard computed"
    );

    Ok(dashboard)
}
