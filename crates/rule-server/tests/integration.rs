use axum::http::StatusCode;
use http_body_util::BodyExt;
use rule_core::config::ClientConfig;
use rule_core::context::{self, SignedIn, Startup};
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn memory_startup() -> Startup<SignedIn> {
    context::connect(ClientConfig::from_parts(
        Some(r#"{"apiKey":"test","endpoint":"memory"}"#),
        Some("test-app"),
        None,
    ))
    .await
}

async fn memory_app() -> axum::Router {
    rule_server::build_router(memory_startup().await)
}

/// Send a request via `oneshot` and return (status, parsed JSON body).
async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(body)).await
}

fn habit<'a>(schema: &'a serde_json::Value, category: &str, id: &str) -> Option<&'a serde_json::Value> {
    schema["categories"]
        .as_array()?
        .iter()
        .find(|c| c["id"] == category)?["habits"]
        .as_array()?
        .iter()
        .find(|h| h["id"] == id)
}

// ---------------------------------------------------------------------------
// Configuration required
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unconfigured_server_returns_503_everywhere() {
    let startup = context::connect(ClientConfig::from_parts(None, None, None)).await;
    let app = rule_server::build_router(startup);

    for uri in ["/api/schema", "/api/logs", "/api/progress", "/api/events"] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        assert_eq!(body["error"], "configuration required");
        assert!(body["detail"].as_str().unwrap().contains("RULE_STORE_CONFIG"));
    }

    let (status, _) = post_json(app, "/api/logs", serde_json::json!({ "counts": {} })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_schema_seeds_default_tree() {
    let app = memory_app().await;
    let (status, body) = get(app, "/api/schema").await;
    assert_eq!(status, StatusCode::OK);
    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 6);
    assert_eq!(categories[0]["id"], "spiritual");
    assert_eq!(habit(&body, "physical", "p1").unwrap()["target"], 5);
    assert_eq!(habit(&body, "emotional", "e1").unwrap()["type"], "boolean");
}

#[tokio::test]
async fn put_schema_replaces_whole_document() {
    let app = memory_app().await;
    let replacement = serde_json::json!({
        "categories": [{
            "id": "focus",
            "label": "Focus",
            "icon": "brain",
            "color": "sky",
            "purpose": "One thing",
            "habits": [{ "id": "f1", "name": "Plan", "rhythm": "daily", "target": 7, "type": "boolean" }]
        }]
    });
    let (status, _) = send(app.clone(), "PUT", "/api/schema", Some(replacement.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(app, "/api/schema").await;
    assert_eq!(body, replacement);
}

#[tokio::test]
async fn put_schema_rejects_duplicate_category() {
    let app = memory_app().await;
    let category = serde_json::json!({ "id": "a", "label": "A", "icon": "heart", "color": "rose" });
    let (status, _) = send(
        app,
        "PUT",
        "/api/schema",
        Some(serde_json::json!({ "categories": [category.clone(), category] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn patch_category_sets_purpose() {
    let app = memory_app().await;
    let (status, body) = send(
        app,
        "PATCH",
        "/api/categories/career",
        Some(serde_json::json!({ "purpose": "Craft" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let career = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == "career")
        .unwrap();
    assert_eq!(career["purpose"], "Craft");
}

#[tokio::test]
async fn patch_unknown_category_returns_404() {
    let app = memory_app().await;
    let (status, _) = send(
        app,
        "PATCH",
        "/api/categories/nope",
        Some(serde_json::json!({ "purpose": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_rename_and_remove_habit() {
    let app = memory_app().await;
    let (status, body) = post_json(
        app.clone(),
        "/api/categories/physical/habits",
        serde_json::json!({ "name": "Stretch", "rhythm": "daily", "target": 7, "type": "boolean" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("physical-"));

    let uri = format!("/api/categories/physical/habits/{id}");
    let (status, body) = send(
        app.clone(),
        "PATCH",
        &uri,
        Some(serde_json::json!({ "name": "Mobility", "target": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = habit(&body, "physical", &id).unwrap();
    assert_eq!(updated["name"], "Mobility");
    assert_eq!(updated["target"], 3);

    let (status, body) = send(app.clone(), "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"]["id"], id.as_str());
    assert!(habit(&body["schema"], "physical", &id).is_none());

    let (status, _) = send(app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_habit_without_fields_is_bad_request() {
    let app = memory_app().await;
    let (status, _) = send(
        app,
        "PATCH",
        "/api/categories/physical/habits/p1",
        Some(serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Logs and progress
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logs_start_empty() {
    let app = memory_app().await;
    let (status, body) = get(app, "/api/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn review_with_unknown_habit_is_rejected() {
    let app = memory_app().await;
    let (status, body) = post_json(
        app.clone(),
        "/api/logs",
        serde_json::json!({ "counts": { "s1": 1, "zz9": 2 } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("unknown habit 'zz9'"));

    let (_, body) = get(app, "/api/logs").await;
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn posted_reviews_list_newest_first() {
    let app = memory_app().await;
    let mut ids = Vec::new();
    for n in 1..=3 {
        let (status, body) = post_json(
            app.clone(),
            "/api/logs",
            serde_json::json!({ "counts": { "s1": n }, "reflection": format!("day {n}") }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let (_, body) = get(app.clone(), "/api/logs").await;
    let listed: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    let expected: Vec<&str> = ids.iter().rev().map(String::as_str).collect();
    assert_eq!(listed, expected);
    assert_eq!(body[0]["data"]["s1"], 3);

    let (_, body) = get(app, "/api/logs?limit=1").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn progress_covers_trailing_window() {
    let app = memory_app().await;
    for n in [0, 0, 1, 1, 0, 2, 1, 4] {
        post_json(
            app.clone(),
            "/api/logs",
            serde_json::json!({ "counts": { "p1": n } }),
        )
        .await;
    }
    let (status, body) = get(app, "/api/progress").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["window"], 7);
    let physical = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == "physical")
        .unwrap();
    // The oldest entry (4) falls outside the window of seven.
    assert_eq!(physical["habits"][0]["current"], 5);
    assert_eq!(physical["habits"][0]["progress"], 100);
}

#[tokio::test]
async fn removed_habit_is_omitted_from_progress() {
    let app = memory_app().await;
    post_json(app.clone(), "/api/logs", serde_json::json!({ "counts": { "c1": 4 } })).await;
    send(app.clone(), "DELETE", "/api/categories/career/habits/c1", None).await;

    let (status, body) = get(app, "/api/progress").await;
    assert_eq!(status, StatusCode::OK);
    let career = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == "career")
        .unwrap();
    assert_eq!(career["habits"], serde_json::json!([]));
    assert_eq!(career["current"], 0);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_stream_opens_with_both_snapshots() {
    let app = memory_app().await;
    let req = axum::http::Request::builder()
        .uri("/api/events")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ct = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(ct.starts_with("text/event-stream"), "{ct}");

    let mut body = response.into_body();
    let mut text = String::new();
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while !(text.contains("event: schema") && text.contains("event: logs")) {
            let frame = body.frame().await.unwrap().unwrap();
            if let Ok(data) = frame.into_data() {
                text.push_str(&String::from_utf8_lossy(&data));
            }
        }
    })
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Directory store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn directory_store_persists_across_routers() {
    let dir = TempDir::new().unwrap();
    let raw = serde_json::json!({ "apiKey": "test", "endpoint": dir.path() }).to_string();
    let config = || ClientConfig::from_parts(Some(raw.as_str()), None, None);

    let app = rule_server::build_router(context::connect(config()).await);
    let (status, _) = post_json(app, "/api/logs", serde_json::json!({ "data": { "r1": 2 } })).await;
    assert_eq!(status, StatusCode::CREATED);

    let app = rule_server::build_router(context::connect(config()).await);
    let (_, body) = get(app, "/api/logs").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["data"]["r1"], 2);
}
