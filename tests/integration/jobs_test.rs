//! Integration tests for the submitter-facing job endpoints.

mod helpers;

use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_submit_job_starts_waiting() {
    let app = helpers::TestApp::new();

    let response = app
        .request(
            "POST",
            "/jobs",
            Some(json!({
                "submitter": "alice",
                "description": "nightly build",
                "command": "make all",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["identifier"], json!(1));
    assert_eq!(response.body["submitter"], "alice");
    assert_eq!(response.body["command"], "make all");
    assert_eq!(response.body["logfile_handle"], json!(null));
    assert_eq!(response.event_statuses(), vec!["WAITING"]);
    assert_eq!(response.body["events"][0]["sequence"], json!(1));
}

#[tokio::test]
async fn test_submit_job_missing_fields_rejected() {
    let app = helpers::TestApp::new();

    let response = app
        .request(
            "POST",
            "/jobs",
            Some(json!({ "submitter": "alice", "description": "no command" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let response = app
        .request(
            "POST",
            "/jobs",
            Some(json!({ "submitter": "   ", "description": "d", "command": "c" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let listed = app.request("GET", "/jobs", None).await;
    assert_eq!(listed.body, json!([]));
}

#[tokio::test]
async fn test_submit_job_malformed_json_rejected() {
    let app = helpers::TestApp::new();

    let req = http::Request::builder()
        .method("POST")
        .uri("/jobs")
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .expect("request");
    let response = tower::ServiceExt::oneshot(app.router.clone(), req)
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_identifiers_increase_and_are_not_reused() {
    let app = helpers::TestApp::new();

    let first = app.submit("alice", "echo 1").await;
    let second = app.submit("alice", "echo 2").await;
    assert!(second > first);

    let deleted = app.request("DELETE", &format!("/jobs/{second}"), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let third = app.submit("alice", "echo 3").await;
    assert!(third > second);
}

#[tokio::test]
async fn test_list_jobs_filters() {
    let app = helpers::TestApp::new();

    let done = app.submit("alice", "echo done").await;
    let running = app.submit("bob", "echo running").await;
    let _waiting = app.submit("alice", "echo waiting").await;

    let claimed = app.request("GET", "/runners/available-job", None).await;
    assert_eq!(claimed.body["identifier"], json!(done));
    assert_eq!(app.update(done, json!("DONE")).await.status, StatusCode::NO_CONTENT);
    let claimed = app.request("GET", "/runners/available-job", None).await;
    assert_eq!(claimed.body["identifier"], json!(running));

    let all = app.request("GET", "/jobs", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().map(Vec::len), Some(3));

    let active = app.request("GET", "/jobs?active=true", None).await;
    let ids: Vec<i64> = active
        .body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|j| j["identifier"].as_i64())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&done));

    let alice_active = app
        .request("GET", "/jobs?active=true&submitter=alice", None)
        .await;
    assert_eq!(alice_active.body.as_array().map(Vec::len), Some(1));
    assert_eq!(alice_active.body[0]["command"], "echo waiting");
}

#[tokio::test]
async fn test_get_job_and_events() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "cargo test").await;

    app.request("GET", "/runners/available-job", None).await;
    app.update(id, json!("DONE")).await;

    let job = app.request("GET", &format!("/jobs/{id}"), None).await;
    assert_eq!(job.status, StatusCode::OK);
    assert_eq!(job.event_statuses(), vec!["WAITING", "RUNNING", "DONE"]);

    let events = app.request("GET", &format!("/jobs/{id}/events"), None).await;
    assert_eq!(events.status, StatusCode::OK);
    let sequences: Vec<i64> = events
        .body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|e| e["sequence"].as_i64())
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_get_job_not_found_or_malformed() {
    let app = helpers::TestApp::new();

    let missing = app.request("GET", "/jobs/42", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["error"], "NOT_FOUND");

    let malformed = app.request("GET", "/jobs/forty-two", None).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_job() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "sleep 1").await;

    let removed = app.request("DELETE", &format!("/jobs/{id}"), None).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);

    let gone = app.request("GET", &format!("/jobs/{id}"), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let again = app.request("DELETE", &format!("/jobs/{id}"), None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = helpers::TestApp::new();
    app.submit("alice", "true").await;

    let health = app.request("GET", "/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "ok");

    let detailed = app.request("GET", "/health/detailed", None).await;
    assert_eq!(detailed.status, StatusCode::OK);
    assert_eq!(detailed.body["job_store"]["backend"], "memory");
    assert_eq!(detailed.body["log_store"]["healthy"], json!(true));
    assert_eq!(detailed.body["jobs"]["total"], json!(1));
    assert_eq!(detailed.body["jobs"]["waiting"], json!(1));
}
