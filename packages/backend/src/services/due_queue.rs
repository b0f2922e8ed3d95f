use chrono::{DateTime, Utc};
use recall_algo::{new_word_budget, select_due, QueueEntry};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::EngineConfig;
use crate::db::operations::{count_first_reviews_between, list_due_reviews, list_unreviewed};
use crate::services::collection::{attach_catalog, RecordView};
use crate::services::review::ReviewError;
use crate::services::settings;

#[derive(Debug, Clone, Default)]
pub struct DueQuery {
    pub limit: Option<i64>,
    pub new_quota: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueWords {
    pub words: Vec<RecordView>,
    pub total: usize,
    pub review_count: usize,
    pub new_count: usize,
    pub new_budget: usize,
}

/// Build the review session for `now`.
///
/// Due reviews come first in queue order; never-reviewed words only fill the
/// slots they leave, bounded by what remains of today's new-word quota.
pub async fn get_due_words(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    query: DueQuery,
    now: DateTime<Utc>,
) -> Result<DueWords, ReviewError> {
    let resolved = settings::resolve(pool, engine, user_id).await?;
    let limit = engine.queue.clamp_limit(query.limit) as usize;
    let quota = query.new_quota.unwrap_or(resolved.daily_new_quota) as usize;

    let reviews = list_due_reviews(pool, user_id, now, limit as i64).await?;

    let (day_start, day_end) = resolved
        .quota_calendar
        .day_bounds(resolved.quota_calendar.today(now));
    let introduced_today = count_first_reviews_between(pool, user_id, day_start, day_end).await?;
    let budget = new_word_budget(limit, reviews.len(), quota, introduced_today.max(0) as usize);

    let fresh = if budget > 0 {
        list_unreviewed(pool, user_id, now, budget as i64).await?
    } else {
        Vec::new()
    };

    let mut candidates = reviews;
    candidates.extend(fresh);
    let selected = select_due(candidates, now, limit, budget);

    let new_count = selected
        .iter()
        .filter(|r| r.is_unreviewed())
        .count();
    let review_count = selected.len() - new_count;

    tracing::debug!(
        user_id,
        limit,
        quota,
        introduced_today,
        review_count,
        new_count,
        "due queue built"
    );

    let words = attach_catalog(pool, selected).await?;
    Ok(DueWords {
        total: words.len(),
        words,
        review_count,
        new_count,
        new_budget: budget,
    })
}
