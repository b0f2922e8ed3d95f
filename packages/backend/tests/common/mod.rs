#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use recall_backend::config::{Config, EngineConfig};
use recall_backend::db::config::DbConfig;
use recall_backend::db::DatabaseProxy;
use recall_backend::services::collection::{self, EnrollWord, RecordView};
use recall_backend::services::review::{self, ReviewOutcome, SubmitReview};

pub async fn memory_proxy() -> Arc<DatabaseProxy> {
    DatabaseProxy::connect(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

pub async fn create_test_app() -> Router {
    recall_backend::build_router(memory_proxy().await, Config::default())
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub async fn enroll(
    proxy: &DatabaseProxy,
    engine: &EngineConfig,
    user_id: &str,
    word_id: &str,
    now: DateTime<Utc>,
) -> RecordView {
    collection::enroll(
        proxy.pool(),
        engine,
        user_id,
        EnrollWord {
            word_id: word_id.to_string(),
            word_text: format!("text-{word_id}"),
            phonetic: None,
            definitions: None,
        },
        now,
    )
    .await
    .expect("enroll")
}

pub async fn review_at(
    proxy: &DatabaseProxy,
    engine: &EngineConfig,
    user_id: &str,
    record_id: &str,
    quality: i64,
    now: DateTime<Utc>,
) -> ReviewOutcome {
    review::submit_review(
        proxy.pool(),
        engine,
        user_id,
        SubmitReview {
            user_word_id: record_id.to_string(),
            quality: quality.into(),
            expected_version: None,
        },
        now,
    )
    .await
    .expect("submit review")
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
