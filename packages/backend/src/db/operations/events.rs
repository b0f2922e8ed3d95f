use chrono::{DateTime, Utc};
use recall_algo::sanitize::{sanitize_count, sanitize_interval};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{from_millis, to_millis};

/// Immutable log entry written once per accepted review
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub id: String,
    pub user_id: String,
    pub user_word_id: String,
    pub quality: u8,
    pub submitted_at: DateTime<Utc>,
    pub resulting_interval: u32,
    #[serde(rename = "resultingEF")]
    pub resulting_ef: f64,
    pub resulting_repetitions: u32,
    pub mastered_transition: bool,
}

pub async fn insert_event(conn: &mut SqliteConnection, event: &ReviewEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "review_events"
          ("id","userId","userWordId","quality","submittedAt","resultingInterval",
           "resultingEF","resultingRepetitions","masteredTransition")
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.id)
    .bind(&event.user_id)
    .bind(&event.user_word_id)
    .bind(i64::from(event.quality))
    .bind(to_millis(event.submitted_at))
    .bind(i64::from(event.resulting_interval))
    .bind(event.resulting_ef)
    .bind(i64::from(event.resulting_repetitions))
    .bind(event.mastered_transition)
    .execute(conn)
    .await?;
    Ok(())
}

/// Submission times in `[start, end)`, oldest first
pub async fn list_event_times(
    pool: &SqlitePool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
    let raw: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT "submittedAt" FROM "review_events"
        WHERE "userId" = ? AND "submittedAt" >= ? AND "submittedAt" < ?
        ORDER BY "submittedAt" ASC
        "#,
    )
    .bind(user_id)
    .bind(to_millis(start))
    .bind(to_millis(end))
    .fetch_all(pool)
    .await?;
    Ok(raw.into_iter().map(from_millis).collect())
}

/// Distinct words with at least one review in `[start, end)`
pub async fn count_reviewed_words_between(
    pool: &SqlitePool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT "userWordId") FROM "review_events"
        WHERE "userId" = ? AND "submittedAt" >= ? AND "submittedAt" < ?
        "#,
    )
    .bind(user_id)
    .bind(to_millis(start))
    .bind(to_millis(end))
    .fetch_one(pool)
    .await
}

/// Words whose very first review falls in `[start, end)`
pub async fn count_first_reviews_between(
    pool: &SqlitePool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM (
            SELECT MIN("submittedAt") AS "firstAt" FROM "review_events"
            WHERE "userId" = ?
            GROUP BY "userWordId"
        )
        WHERE "firstAt" >= ? AND "firstAt" < ?
        "#,
    )
    .bind(user_id)
    .bind(to_millis(start))
    .bind(to_millis(end))
    .fetch_one(pool)
    .await
}

pub async fn count_mastery_credits_between(
    pool: &SqlitePool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "review_events"
        WHERE "userId" = ? AND "masteredTransition" = 1
          AND "submittedAt" >= ? AND "submittedAt" < ?
        "#,
    )
    .bind(user_id)
    .bind(to_millis(start))
    .bind(to_millis(end))
    .fetch_one(pool)
    .await
}

/// Review history of one record, newest first
pub async fn list_events_for_record(
    pool: &SqlitePool,
    user_id: &str,
    record_id: &str,
    limit: i64,
) -> Result<Vec<ReviewEvent>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "id","userId","userWordId","quality","submittedAt","resultingInterval",
               "resultingEF","resultingRepetitions","masteredTransition"
        FROM "review_events"
        WHERE "userId" = ? AND "userWordId" = ?
        ORDER BY "submittedAt" DESC, "id" DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(record_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_event).collect()
}

fn map_event(row: &SqliteRow) -> Result<ReviewEvent, sqlx::Error> {
    let quality: i64 = row.try_get("quality")?;
    let interval: i64 = row.try_get("resultingInterval")?;
    let repetitions: i64 = row.try_get("resultingRepetitions")?;
    Ok(ReviewEvent {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        user_word_id: row.try_get("userWordId")?,
        quality: quality.clamp(0, 5) as u8,
        submitted_at: from_millis(row.try_get("submittedAt")?),
        resulting_interval: sanitize_interval(interval),
        resulting_ef: row.try_get("resultingEF")?,
        resulting_repetitions: sanitize_count(repetitions),
        mastered_transition: row.try_get("masteredTransition")?,
    })
}
