//! Integration tests for the runner-facing endpoints.

mod helpers;

use std::collections::HashSet;

use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_claim_with_nothing_waiting() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/runners/available-job", None).await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.raw.is_empty());
}

#[tokio::test]
async fn test_claim_returns_oldest_waiting_job_as_running() {
    let app = helpers::TestApp::new();
    let first = app.submit("alice", "echo first").await;
    let second = app.submit("bob", "echo second").await;

    let claimed = app.request("GET", "/runners/available-job", None).await;
    assert_eq!(claimed.status, StatusCode::OK);
    assert_eq!(claimed.body["identifier"], json!(first));
    assert_eq!(claimed.event_statuses(), vec!["WAITING", "RUNNING"]);

    let claimed = app.request("GET", "/runners/available-job", None).await;
    assert_eq!(claimed.body["identifier"], json!(second));

    let empty = app.request("GET", "/runners/available-job", None).await;
    assert_eq!(empty.status, StatusCode::NO_CONTENT);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_hand_out_each_job_once() {
    let app = helpers::TestApp::new();
    for i in 0..5 {
        app.submit("alice", &format!("echo {i}")).await;
    }

    let mut handles = Vec::new();
    for _ in 0..12 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            let req = http::Request::builder()
                .uri("/runners/available-job")
                .body(axum::body::Body::empty())
                .expect("request");
            let response = tower::ServiceExt::oneshot(router, req)
                .await
                .expect("response");
            let status = response.status();
            let body = http_body_util::BodyExt::collect(response.into_body())
                .await
                .expect("body")
                .to_bytes();
            (status, body)
        }));
    }

    let mut claimed = HashSet::new();
    let mut empty = 0;
    for handle in handles {
        let (status, body) = handle.await.expect("task");
        match status {
            StatusCode::OK => {
                let job: serde_json::Value = serde_json::from_slice(&body).expect("json");
                assert!(claimed.insert(job["identifier"].as_i64().expect("id")));
            }
            StatusCode::NO_CONTENT => empty += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(claimed.len(), 5);
    assert_eq!(empty, 7);
}

#[tokio::test]
async fn test_update_job_by_name_and_ordinal() {
    let app = helpers::TestApp::new();
    let by_name = app.submit("alice", "echo a").await;
    let by_ordinal = app.submit("alice", "echo b").await;

    app.request("GET", "/runners/available-job", None).await;
    app.request("GET", "/runners/available-job", None).await;

    let response = app.update(by_name, json!("DONE")).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.update(by_ordinal, json!(4)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let job = app.request("GET", &format!("/jobs/{by_name}"), None).await;
    assert_eq!(job.event_statuses(), vec!["WAITING", "RUNNING", "DONE"]);
    let job = app.request("GET", &format!("/jobs/{by_ordinal}"), None).await;
    assert_eq!(job.event_statuses(), vec!["WAITING", "RUNNING", "TERMINATED"]);
}

#[tokio::test]
async fn test_update_job_invalid_status() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "echo").await;

    for token in [json!("done"), json!("FINISHED"), json!(6), json!(-1), json!(null)] {
        let response = app.update(id, token.clone()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "token {token}");
        assert_eq!(response.body["error"], "INVALID_STATUS");
    }

    let job = app.request("GET", &format!("/jobs/{id}"), None).await;
    assert_eq!(job.event_statuses(), vec!["WAITING"]);
}

#[tokio::test]
async fn test_update_job_unknown_or_missing_identifier() {
    let app = helpers::TestApp::new();

    let unknown = app.update(99, json!("DONE")).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let invalid_for_unknown = app.update(99, json!("BOGUS")).await;
    assert_eq!(invalid_for_unknown.status, StatusCode::BAD_REQUEST);

    let missing = app
        .request("PUT", "/runners/update-job", Some(json!({ "status": "DONE" })))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_update_job_illegal_transitions() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "echo").await;

    let skip_running = app.update(id, json!("DONE")).await;
    assert_eq!(skip_running.status, StatusCode::CONFLICT);
    assert_eq!(skip_running.body["error"], "ILLEGAL_TRANSITION");

    app.request("GET", "/runners/available-job", None).await;
    assert_eq!(app.update(id, json!("DONE")).await.status, StatusCode::NO_CONTENT);

    for token in [json!("RUNNING"), json!("WAITING"), json!("TERMINATED")] {
        let response = app.update(id, token).await;
        assert_eq!(response.status, StatusCode::CONFLICT);
    }

    let job = app.request("GET", &format!("/jobs/{id}"), None).await;
    assert_eq!(job.event_statuses(), vec!["WAITING", "RUNNING", "DONE"]);
}

#[tokio::test]
async fn test_unknown_status_can_resume() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "flaky").await;
    app.request("GET", "/runners/available-job", None).await;

    assert_eq!(app.update(id, json!("UNKNOWN")).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.update(id, json!(3)).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.update(id, json!("DONE")).await.status, StatusCode::NO_CONTENT);

    let job = app.request("GET", &format!("/jobs/{id}"), None).await;
    assert_eq!(
        job.event_statuses(),
        vec!["WAITING", "RUNNING", "UNKNOWN", "RUNNING", "DONE"]
    );
}
