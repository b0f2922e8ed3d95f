use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;

use crate::middleware::auth::AuthUser;
use crate::response::{created, message, ok, AppError};
use crate::routes::{parse_json, query_i64};
use crate::services::collection::{self, BatchEnroll, EnrollWord, ListWords};
use crate::services::review;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_words).post(enroll))
        .route("/batch", post(enroll_batch))
        .route("/:id", get(get_word).delete(remove_word))
        .route("/:id/history", get(history))
}

async fn enroll(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: EnrollWord = parse_json(&body)?;
    let data = collection::enroll(state.pool(), state.engine(), &user.id, request, Utc::now()).await?;
    Ok(created(data))
}

async fn enroll_batch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: BatchEnroll = parse_json(&body)?;
    let data =
        collection::enroll_batch(state.pool(), state.engine(), &user.id, request, Utc::now()).await?;
    Ok(created(data))
}

async fn list_words(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let text = |key: &str| {
        query
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let request = ListWords {
        page: query_i64(&query, "page")?,
        limit: query_i64(&query, "limit")?,
        sort: text("sort"),
        order: text("order"),
        status: text("status"),
    };
    let data = collection::list_words(state.pool(), state.engine(), &user.id, request).await?;
    Ok(ok(data))
}

async fn get_word(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let data = collection::get_word(state.pool(), &user.id, &id).await?;
    Ok(ok(data))
}

async fn remove_word(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    collection::remove(state.pool(), &user.id, &id).await?;
    Ok(message("单词已移除"))
}

async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let limit = query_i64(&query, "limit")?.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let data = review::history(state.pool(), &user.id, &id, limit).await?;
    Ok(ok(data))
}
