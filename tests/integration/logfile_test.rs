//! Integration tests for logfile upload and download.

mod helpers;

use http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_upload_and_download_logfile() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "make").await;
    let content = b"compiling...\nfinished in 3.2s\n";

    let uploaded = app
        .upload(&format!("/jobs/{id}/logs"), "logfile", content)
        .await;
    assert_eq!(uploaded.status, StatusCode::CREATED, "{:?}", uploaded.body);
    assert_eq!(uploaded.body["identifier"], json!(id));
    assert_eq!(uploaded.body["size_bytes"], json!(content.len()));
    let handle = uploaded.body["logfile_handle"]
        .as_str()
        .expect("handle")
        .to_string();
    assert_eq!(handle.len(), 32);

    let job = app.request("GET", &format!("/jobs/{id}"), None).await;
    assert_eq!(job.body["logfile_handle"], json!(handle));

    let downloaded = app.request("GET", &format!("/jobs/{id}/logs"), None).await;
    assert_eq!(downloaded.status, StatusCode::OK);
    assert_eq!(downloaded.raw.as_ref(), content);
    assert_eq!(
        downloaded.headers["content-type"],
        "application/octet-stream"
    );
    assert!(
        downloaded.headers["content-disposition"]
            .to_str()
            .expect("header")
            .contains(&format!("job-{id}.log"))
    );
}

#[tokio::test]
async fn test_logfile_is_set_once() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "make").await;
    let path = format!("/jobs/{id}/logs");

    let first = app.upload(&path, "logfile", b"first run").await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app.upload(&path, "logfile", b"second run").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["error"], "CONFLICT");

    let downloaded = app.request("GET", &path, None).await;
    assert_eq!(downloaded.raw.as_ref(), b"first run");
    assert_eq!(app.blobs.len(), 1);
}

#[tokio::test]
async fn test_upload_requires_logfile_field() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "make").await;

    let wrong_field = app
        .upload(&format!("/jobs/{id}/logs"), "attachment", b"data")
        .await;
    assert_eq!(wrong_field.status, StatusCode::BAD_REQUEST);

    let not_multipart = app
        .request("POST", &format!("/jobs/{id}/logs"), Some(json!({ "logfile": "x" })))
        .await;
    assert_eq!(not_multipart.status, StatusCode::BAD_REQUEST);

    let job = app.request("GET", &format!("/jobs/{id}"), None).await;
    assert_eq!(job.body["logfile_handle"], json!(null));
}

#[tokio::test]
async fn test_upload_for_unknown_job() {
    let app = helpers::TestApp::new();

    let response = app.upload("/jobs/7/logs", "logfile", b"orphan").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_without_logfile() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "make").await;

    let no_logfile = app.request("GET", &format!("/jobs/{id}/logs"), None).await;
    assert_eq!(no_logfile.status, StatusCode::NOT_FOUND);

    let no_job = app.request("GET", "/jobs/1234/logs", None).await;
    assert_eq!(no_job.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_job_discards_logfile() {
    let app = helpers::TestApp::new();
    let id = app.submit("alice", "make").await;
    app.upload(&format!("/jobs/{id}/logs"), "logfile", b"bytes")
        .await;
    assert_eq!(app.blobs.len(), 1);

    let removed = app.request("DELETE", &format!("/jobs/{id}"), None).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);

    let downloaded = app.request("GET", &format!("/jobs/{id}/logs"), None).await;
    assert_eq!(downloaded.status, StatusCode::NOT_FOUND);
    assert!(app.blobs.is_empty());
}
