use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;

use common::send;

const USER: Option<&str> = Some("user-1");

async fn enroll_word(app: &axum::Router, word_id: &str) -> serde_json::Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/words",
        USER,
        Some(json!({
            "wordId": word_id,
            "wordText": format!("word {word_id}"),
            "phonetic": "/wɜːd/",
            "definitions": [
                { "partOfSpeech": "noun", "meaning": "a unit of language", "example": "say a word" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn test_health_root() {
    let app = common::create_test_app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_health_live() {
    let app = common::create_test_app().await;
    let (status, body) = send(&app, Method::GET, "/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_unauthorized_without_user_header() {
    let app = common::create_test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/review/due", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_route_returns_envelope() {
    let app = common::create_test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/nope", USER, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_enroll_review_and_read_back() {
    let app = common::create_test_app().await;
    let record = enroll_word(&app, "w-apple").await;
    let id = record["id"].as_str().unwrap().to_string();
    assert_eq!(record["version"], 1);
    assert_eq!(record["repetitions"], 0);
    assert_eq!(record["wordText"], "word w-apple");
    assert_eq!(record["definitions"][0]["partOfSpeech"], "noun");

    let (status, body) = send(&app, Method::GET, "/api/review/due", USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["newCount"], 1);
    assert_eq!(body["data"]["words"][0]["id"], id.as_str());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/review/submit",
        USER,
        Some(json!({ "userWordId": id, "quality": 4, "expectedVersion": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let updated = &body["data"];
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["repetitions"], 1);
    assert_eq!(updated["intervalDays"], 1);
    assert_eq!(updated["easinessFactor"], 2.5);
    assert_eq!(updated["masteredNow"], false);
    assert!(updated["lastReviewedAt"].is_string());

    let (status, body) = send(&app, Method::GET, &format!("/api/words/{id}"), USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], 2);
    assert_eq!(body["data"]["dueAt"], updated["dueAt"]);
    assert_eq!(body["data"]["easinessFactor"], updated["easinessFactor"]);

    let (status, body) =
        send(&app, Method::GET, &format!("/api/words/{id}/history"), USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["quality"], 4);
    assert_eq!(body["data"][0]["resultingEF"], 2.5);

    // reviewed words are no longer due today
    let (_, body) = send(&app, Method::GET, "/api/review/due", USER, None).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_stale_version_is_rejected() {
    let app = common::create_test_app().await;
    let record = enroll_word(&app, "w-stale").await;
    let id = record["id"].as_str().unwrap().to_string();

    let submit = json!({ "userWordId": id, "quality": 5, "expectedVersion": 1 });
    let (status, _) = send(&app, Method::POST, "/api/review/submit", USER, Some(submit.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, "/api/review/submit", USER, Some(submit)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (_, body) = send(&app, Method::GET, &format!("/api/words/{id}"), USER, None).await;
    assert_eq!(body["data"]["version"], 2);
    assert_eq!(body["data"]["repetitions"], 1);
}

#[tokio::test]
async fn test_invalid_quality_is_rejected_before_lookup() {
    let app = common::create_test_app().await;

    for quality in [-1, 6, 42] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/review/submit",
            USER,
            Some(json!({ "userWordId": "does-not-exist", "quality": quality })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_QUALITY");
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/review/submit",
        USER,
        Some(json!({ "userWordId": "does-not-exist", "quality": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_non_integer_quality_is_invalid_quality() {
    let app = common::create_test_app().await;
    let record = enroll_word(&app, "w-frac").await;

    for quality in [json!(3.5), json!(1e30), json!(18446744073709551615u64)] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/review/submit",
            USER,
            Some(json!({ "userWordId": record["id"], "quality": quality })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{quality}");
        assert_eq!(body["code"], "INVALID_QUALITY", "{quality}");
    }

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/words/{}", record["id"].as_str().unwrap()),
        USER,
        None,
    )
    .await;
    assert_eq!(body["data"]["version"], 1);
}

#[tokio::test]
async fn test_submit_accepts_snake_case_id() {
    let app = common::create_test_app().await;
    let record = enroll_word(&app, "w-snake").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/review/submit",
        USER,
        Some(json!({ "user_word_id": record["id"], "quality": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_body_gets_envelope() {
    let app = common::create_test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/review/submit",
        USER,
        Some(json!({ "quality": "five" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_duplicate_and_invalid_enrollment() {
    let app = common::create_test_app().await;
    enroll_word(&app, "w-dup").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/words",
        USER,
        Some(json!({ "wordId": "w-dup", "wordText": "dup" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_ENROLLED");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/words",
        USER,
        Some(json!({
            "wordId": "w-bad",
            "wordText": "bad",
            "definitions": [{ "partOfSpeech": "gerund", "meaning": "x" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // the same word is independent per user
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/words",
        Some("user-2"),
        Some(json!({ "wordId": "w-dup", "wordText": "dup" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_records_are_scoped_to_user() {
    let app = common::create_test_app().await;
    let record = enroll_word(&app, "w-private").await;
    let id = record["id"].as_str().unwrap();

    let (status, _) = send(&app, Method::GET, &format!("/api/words/{id}"), Some("intruder"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/review/submit",
        Some("intruder"),
        Some(json!({ "userWordId": id, "quality": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_word() {
    let app = common::create_test_app().await;
    let record = enroll_word(&app, "w-gone").await;
    let id = record["id"].as_str().unwrap();

    let (status, body) = send(&app, Method::DELETE, &format!("/api/words/{id}"), USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, Method::GET, &format!("/api/words/{id}"), USER, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/words/{id}"), USER, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preview_intervals() {
    let app = common::create_test_app().await;
    let record = enroll_word(&app, "w-preview").await;
    let id = record["id"].as_str().unwrap();

    let (status, body) =
        send(&app, Method::GET, &format!("/api/review/preview/{id}"), USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["again"], 1);
    assert_eq!(body["data"]["hard"], 1);
    assert_eq!(body["data"]["easy"], 1);

    // preview never writes
    let (_, body) = send(&app, Method::GET, &format!("/api/words/{id}"), USER, None).await;
    assert_eq!(body["data"]["version"], 1);
}

#[tokio::test]
async fn test_dashboard_and_stats_shapes() {
    let app = common::create_test_app().await;
    let record = enroll_word(&app, "w-dash").await;

    let (status, body) = send(&app, Method::GET, "/api/dashboard", USER, None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["todayNew"], 1);
    assert_eq!(data["todayDue"], 0);
    assert_eq!(data["streakDays"], 0);
    assert_eq!(data["recentWords"].as_array().unwrap().len(), 1);
    let weekly = data["weeklyStats"].as_array().unwrap();
    assert_eq!(weekly.len(), 7);
    assert!(weekly.iter().all(|d| d["count"] == 0));

    send(
        &app,
        Method::POST,
        "/api/review/submit",
        USER,
        Some(json!({ "userWordId": record["id"], "quality": 5 })),
    )
    .await;

    let (_, body) = send(&app, Method::GET, "/dashboard", USER, None).await;
    let data = &body["data"];
    assert_eq!(data["streakDays"], 1);
    assert_eq!(data["todayNew"], 0);
    assert_eq!(data["weeklyStats"][6]["count"], 1);

    let (status, body) = send(&app, Method::GET, "/api/review/stats", USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reviewed"], 1);
    assert_eq!(body["data"]["newWords"], 1);
    assert_eq!(body["data"]["masteredToday"], 0);
    assert_eq!(body["data"]["totalDue"], 0);

    let (status, body) = send(&app, Method::GET, "/api/review/stats/daily", USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reviewedCount"], 1);

    let (status, _) =
        send(&app, Method::GET, "/api/review/stats/daily?date=yesterday", USER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let app = common::create_test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/review/settings", USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isDefault"], true);
    assert_eq!(body["data"]["dailyNewQuota"], 10);
    assert_eq!(body["data"]["timezone"], "UTC");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/review/settings",
        USER,
        Some(json!({ "timezone": "Asia/Tokyo", "dailyNewQuota": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["timezone"], "Asia/Tokyo");

    let (_, body) = send(&app, Method::GET, "/api/review/settings", USER, None).await;
    assert_eq!(body["data"]["isDefault"], false);
    assert_eq!(body["data"]["dailyNewQuota"], 3);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/review/settings",
        USER,
        Some(json!({ "timezone": "Mars/Olympus" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/review/settings",
        USER,
        Some(json!({ "dailyNewQuota": -2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_due_query_validation() {
    let app = common::create_test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/review/due?limit=abc", USER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(&app, Method::GET, "/api/review/due?newQuota=-1", USER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for i in 0..3 {
        enroll_word(&app, &format!("w-q{i}")).await;
    }
    let (status, body) = send(&app, Method::GET, "/review/due?newQuota=0", USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);

    let (_, body) = send(&app, Method::GET, "/review/due?limit=2", USER, None).await;
    assert_eq!(body["data"]["total"], 2);
}

#[tokio::test]
async fn test_batch_enroll_and_list_words() {
    let app = common::create_test_app().await;
    enroll_word(&app, "w-existing").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/words/batch",
        USER,
        Some(json!({
            "words": [
                { "wordId": "w-a", "wordText": "alpha" },
                { "wordId": "w-b", "wordText": "beta", "phonetic": "/ˈbiː.tə/" },
                { "wordId": "w-existing", "wordText": "existing" },
                { "wordId": "  ", "wordText": "blank" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["skipped"], 2);
    assert_eq!(body["data"]["words"][1]["phonetic"], "/ˈbiː.tə/");

    let (status, body) = send(&app, Method::GET, "/api/words?limit=2", USER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["limit"], 2);
    assert_eq!(body["data"]["words"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        Method::GET,
        "/words?page=2&limit=2&sort=createdAt&order=asc&status=new",
        USER,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["words"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/api/words?status=forgotten", USER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, Method::GET, "/api/words?page=two", USER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/words/batch",
        USER,
        Some(json!({ "words": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // other users see an empty collection
    let (_, body) = send(&app, Method::GET, "/api/words", Some("user-2"), None).await;
    assert_eq!(body["data"]["total"], 0);
}
