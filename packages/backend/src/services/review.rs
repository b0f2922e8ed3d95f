use chrono::{DateTime, Utc};
use recall_algo::sanitize::{has_invalid_values, sanitize_state};
use recall_algo::{apply_review, preview_intervals, IntervalPreview, Quality, QualityError};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::db::operations::{
    commit_review, find_record, list_events_for_record, truncate_to_millis, CommitOutcome,
    ReviewEvent, WordMemoryRecord,
};
use crate::services::tracker;

const MAX_HISTORY_LIMIT: i64 = 200;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("word record not found: {0}")]
    NotFound(String),
    #[error("record was modified concurrently (expected version {expected}, current {current})")]
    Conflict { expected: i64, current: i64 },
    #[error(transparent)]
    InvalidQuality(#[from] QualityError),
    #[error("{0}")]
    Validation(String),
    #[error("word already in collection: {0}")]
    AlreadyEnrolled(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReview {
    #[serde(alias = "user_word_id")]
    pub user_word_id: String,
    pub quality: serde_json::Number,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    #[serde(flatten)]
    pub record: WordMemoryRecord,
    pub mastered_now: bool,
    pub lapsed: bool,
    pub event_id: String,
}

/// Any JSON number is accepted here so that fractional or oversized values
/// are reported as a bad quality rather than a malformed body.
pub fn parse_quality(raw: &serde_json::Number) -> Result<Quality, QualityError> {
    match raw.as_i64() {
        Some(value) => Quality::new(value),
        None => Err(QualityError::NotAnInteger(raw.to_string())),
    }
}

/// Apply one review to a record.
///
/// Quality is validated before any store access. The record update and the
/// event append commit together or not at all.
pub async fn submit_review(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    request: SubmitReview,
    now: DateTime<Utc>,
) -> Result<ReviewOutcome, ReviewError> {
    let quality = parse_quality(&request.quality)?;
    let now = truncate_to_millis(now);

    let record = find_record(pool, user_id, &request.user_word_id)
        .await?
        .ok_or_else(|| ReviewError::NotFound(request.user_word_id.clone()))?;

    let expected = request.expected_version.unwrap_or(record.version);
    if expected != record.version {
        tracing::warn!(
            user_id,
            user_word_id = %record.id,
            expected,
            current = record.version,
            "stale review rejected"
        );
        return Err(ReviewError::Conflict {
            expected,
            current: record.version,
        });
    }

    let mut state = record.memory_state();
    if has_invalid_values(&state, engine.scheduling.min_easiness) {
        tracing::warn!(user_id, user_word_id = %record.id, ?state, "repairing stored memory state");
        sanitize_state(
            &mut state,
            engine.scheduling.min_easiness,
            engine.scheduling.initial_easiness,
        );
    }

    let transition = apply_review(&state, quality, &engine.scheduling, now);
    let mastered_now = tracker::mastery_credit(&engine.mastery, &transition.previous, &transition.state);

    let event = ReviewEvent {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        user_word_id: record.id.clone(),
        quality: quality.value(),
        submitted_at: now,
        resulting_interval: transition.state.interval_days,
        resulting_ef: transition.state.easiness_factor,
        resulting_repetitions: transition.state.repetitions,
        mastered_transition: mastered_now,
    };

    match commit_review(pool, user_id, &record.id, expected, &transition, event).await? {
        CommitOutcome::Committed { record, event } => {
            tracing::debug!(
                user_id,
                user_word_id = %record.id,
                quality = quality.value(),
                interval = record.interval_days,
                easiness = record.easiness_factor,
                mastered_now,
                "review committed"
            );
            Ok(ReviewOutcome {
                record,
                mastered_now,
                lapsed: transition.lapsed,
                event_id: event.id,
            })
        }
        CommitOutcome::VersionMismatch { current } => {
            tracing::warn!(user_id, user_word_id = %request.user_word_id, expected, current, "concurrent review lost the race");
            Err(ReviewError::Conflict { expected, current })
        }
        CommitOutcome::Missing => Err(ReviewError::NotFound(request.user_word_id)),
    }
}

pub async fn get_record(
    pool: &SqlitePool,
    user_id: &str,
    record_id: &str,
) -> Result<WordMemoryRecord, ReviewError> {
    find_record(pool, user_id, record_id)
        .await?
        .ok_or_else(|| ReviewError::NotFound(record_id.to_string()))
}

/// Intervals the again / hard / easy buttons would schedule, without writing.
pub async fn preview(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    record_id: &str,
) -> Result<IntervalPreview, ReviewError> {
    let record = get_record(pool, user_id, record_id).await?;
    Ok(preview_intervals(&record.memory_state(), &engine.scheduling))
}

/// Review events of one record, newest first. Events outlive the record.
pub async fn history(
    pool: &SqlitePool,
    user_id: &str,
    record_id: &str,
    limit: i64,
) -> Result<Vec<ReviewEvent>, ReviewError> {
    let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
    Ok(list_events_for_record(pool, user_id, record_id, limit).await?)
}
