use chrono::{DateTime, Utc};
use recall_algo::sanitize::sanitize_count;
use sqlx::{Row, SqlitePool};

use super::{from_millis, to_millis};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReviewSettings {
    pub user_id: String,
    pub timezone: String,
    pub daily_new_quota: u32,
    pub updated_at: DateTime<Utc>,
}

pub async fn find_settings(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<StoredReviewSettings>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "userId","timezone","dailyNewQuota","updatedAt"
        FROM "user_review_settings" WHERE "userId" = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let quota: i64 = row.try_get("dailyNewQuota")?;
    Ok(Some(StoredReviewSettings {
        user_id: row.try_get("userId")?,
        timezone: row.try_get("timezone")?,
        daily_new_quota: sanitize_count(quota),
        updated_at: from_millis(row.try_get("updatedAt")?),
    }))
}

pub async fn upsert_settings(
    pool: &SqlitePool,
    settings: &StoredReviewSettings,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "user_review_settings" ("userId","timezone","dailyNewQuota","updatedAt")
        VALUES (?, ?, ?, ?)
        ON CONFLICT("userId") DO UPDATE SET
          "timezone" = excluded."timezone",
          "dailyNewQuota" = excluded."dailyNewQuota",
          "updatedAt" = excluded."updatedAt"
        "#,
    )
    .bind(&settings.user_id)
    .bind(&settings.timezone)
    .bind(i64::from(settings.daily_new_quota))
    .bind(to_millis(settings.updated_at))
    .execute(pool)
    .await?;
    Ok(())
}
