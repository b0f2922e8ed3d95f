use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDate, Utc};

use crate::middleware::auth::AuthUser;
use crate::response::{ok, AppError};
use crate::routes::{parse_json, query_i64};
use crate::services::due_queue::{self, DueQuery};
use crate::services::review::{self, SubmitReview};
use crate::services::settings::{self, SettingsUpdate};
use crate::services::stats;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/due", get(due_words))
        .route("/stats", get(review_stats))
        .route("/stats/daily", get(daily_stats))
        .route("/submit", post(submit))
        .route("/preview/:id", get(preview))
        .route("/settings", get(get_settings).put(update_settings))
}

async fn due_words(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let limit = query_i64(&query, "limit")?;
    let new_quota = match query_i64(&query, "newQuota")? {
        Some(value) if value < 0 => {
            return Err(AppError::validation("newQuota must not be negative"));
        }
        Some(value) => Some(value.min(i64::from(u32::MAX)) as u32),
        None => None,
    };

    let data = due_queue::get_due_words(
        state.pool(),
        state.engine(),
        &user.id,
        DueQuery { limit, new_quota },
        Utc::now(),
    )
    .await?;
    Ok(ok(data))
}

async fn review_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let data = stats::get_review_stats(state.pool(), state.engine(), &user.id, Utc::now()).await?;
    Ok(ok(data))
}

async fn daily_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let date = match query.get("date").map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| AppError::validation("date must be YYYY-MM-DD"))?,
        ),
        None => None,
    };
    let data =
        stats::daily_counter_for(state.pool(), state.engine(), &user.id, date, Utc::now()).await?;
    Ok(ok(data))
}

async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: SubmitReview = parse_json(&body)?;
    if request.user_word_id.trim().is_empty() {
        return Err(AppError::validation("userWordId is required"));
    }

    let data = review::submit_review(state.pool(), state.engine(), &user.id, request, Utc::now()).await?;
    Ok(ok(data))
}

async fn preview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let data = review::preview(state.pool(), state.engine(), &user.id, &id).await?;
    Ok(ok(data))
}

async fn get_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let data = settings::get_settings(state.pool(), state.engine(), &user.id).await?;
    Ok(ok(data))
}

async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Response, AppError> {
    let update: SettingsUpdate = parse_json(&body)?;
    let data =
        settings::update_settings(state.pool(), state.engine(), &user.id, update, Utc::now()).await?;
    Ok(ok(data))
}
