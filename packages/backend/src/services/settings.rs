use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::config::{EngineConfig, QuotaReset};
use crate::db::operations::settings::{self as store, StoredReviewSettings};
use crate::services::calendar::UserCalendar;
use crate::services::review::ReviewError;

const MAX_DAILY_NEW_QUOTA: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSettings {
    pub timezone: String,
    pub daily_new_quota: u32,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub timezone: Option<String>,
    pub daily_new_quota: Option<i64>,
}

/// Settings ready for the engine to use
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSettings {
    pub calendar: UserCalendar,
    pub daily_new_quota: u32,
    pub quota_calendar: UserCalendar,
}

pub async fn resolve(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
) -> Result<ResolvedSettings, ReviewError> {
    let stored = store::find_settings(pool, user_id).await?;

    let (tz, quota) = match stored {
        Some(row) => {
            let tz = row.timezone.parse::<Tz>().unwrap_or_else(|_| {
                tracing::warn!(user_id, timezone = %row.timezone, "stored timezone is invalid, using default");
                engine.defaults.timezone
            });
            (tz, row.daily_new_quota)
        }
        None => (engine.defaults.timezone, engine.defaults.daily_new_quota),
    };

    let calendar = UserCalendar::new(tz);
    let quota_calendar = match engine.queue.quota_reset {
        QuotaReset::UserLocal => calendar,
        QuotaReset::Utc => UserCalendar::utc(),
    };

    Ok(ResolvedSettings {
        calendar,
        daily_new_quota: quota,
        quota_calendar,
    })
}

pub async fn get_settings(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
) -> Result<ReviewSettings, ReviewError> {
    Ok(match store::find_settings(pool, user_id).await? {
        Some(row) => ReviewSettings {
            timezone: row.timezone,
            daily_new_quota: row.daily_new_quota,
            is_default: false,
        },
        None => ReviewSettings {
            timezone: engine.defaults.timezone.name().to_string(),
            daily_new_quota: engine.defaults.daily_new_quota,
            is_default: true,
        },
    })
}

/// Merge a partial update over the current settings and persist it.
pub async fn update_settings(
    pool: &SqlitePool,
    engine: &EngineConfig,
    user_id: &str,
    update: SettingsUpdate,
    now: DateTime<Utc>,
) -> Result<ReviewSettings, ReviewError> {
    let current = get_settings(pool, engine, user_id).await?;

    let timezone = match update.timezone {
        Some(raw) => {
            let tz = raw
                .trim()
                .parse::<Tz>()
                .map_err(|_| ReviewError::Validation(format!("unknown timezone: {raw}")))?;
            tz.name().to_string()
        }
        None => current.timezone,
    };

    let daily_new_quota = match update.daily_new_quota {
        Some(value) if (0..=MAX_DAILY_NEW_QUOTA).contains(&value) => value as u32,
        Some(value) => {
            return Err(ReviewError::Validation(format!(
                "dailyNewQuota must be between 0 and {MAX_DAILY_NEW_QUOTA}, got {value}"
            )))
        }
        None => current.daily_new_quota,
    };

    store::upsert_settings(
        pool,
        &StoredReviewSettings {
            user_id: user_id.to_string(),
            timezone: timezone.clone(),
            daily_new_quota,
            updated_at: now,
        },
    )
    .await?;

    tracing::debug!(user_id, %timezone, daily_new_quota, "review settings updated");

    Ok(ReviewSettings {
        timezone,
        daily_new_quota,
        is_default: false,
    })
}
