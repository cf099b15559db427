//! Mock backend tests for the REST remote.
//!
//! These tests use wiremock to simulate the hosted backend and check request
//! shape and status mapping without network access.

use std::time::Duration;

use domsync_core::{Payload, RemoteError, RemoteStore, RemoteUrl, TableName};
use domsync_rest::{RestClient, RestRemote};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a remote URL from a mock server.
fn mock_url(server: &MockServer) -> RemoteUrl {
    RemoteUrl::new(format!("http://127.0.0.1:{}", server.address().port())).unwrap()
}

fn players() -> TableName {
    TableName::new("players").unwrap()
}

fn zeca() -> Payload {
    Payload::new(json!({ "id": "p1", "nickname": "Zeca" })).unwrap()
}

#[tokio::test]
async fn test_upsert_sends_expected_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/players"))
        .and(query_param("on_conflict", "id"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .and(header(
            "prefer",
            "resolution=merge-duplicates,return=representation",
        ))
        .and(body_json(json!({ "id": "p1", "nickname": "Zeca" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": "p1", "nickname": "Zeca", "created_at": "2024-05-01T12:00:00Z" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let remote = RestRemote::new(mock_url(&server), Some("anon-key")).unwrap();
    let stored = remote.submit(&players(), &zeca()).await.unwrap();

    assert_eq!(
        stored.get("created_at"),
        Some(&json!("2024-05-01T12:00:00Z"))
    );
}

#[tokio::test]
async fn test_empty_response_returns_submitted_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/players"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(&server)
        .await;

    let remote = RestRemote::new(mock_url(&server), None).unwrap();
    let stored = remote.submit(&players(), &zeca()).await.unwrap();

    assert_eq!(stored, zeca());
}

#[tokio::test]
async fn test_custom_identity_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/games"))
        .and(query_param("on_conflict", "slug"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let remote = RestRemote::new(mock_url(&server), None)
        .unwrap()
        .with_identity_field("slug");
    let payload = Payload::new(json!({ "slug": "sunday-league" })).unwrap();

    remote
        .submit(&TableName::new("games").unwrap(), &payload)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_conflict_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/players"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint",
            "details": null,
            "hint": null
        })))
        .mount(&server)
        .await;

    let remote = RestRemote::new(mock_url(&server), None).unwrap();
    let err = remote.submit(&players(), &zeca()).await.unwrap_err();

    match err {
        RemoteError::Rejected { status, code, .. } => {
            assert_eq!(status, Some(409));
            assert_eq!(code.as_deref(), Some("23505"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bad_request_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/players"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "PGRST204",
            "message": "Could not find the 'nickname' column"
        })))
        .mount(&server)
        .await;

    let remote = RestRemote::new(mock_url(&server), None).unwrap();
    let err = remote.submit(&players(), &zeca()).await.unwrap_err();

    assert!(!err.is_unavailable());
    assert!(err.to_string().contains("PGRST204"));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/players"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let remote = RestRemote::new(mock_url(&server), None).unwrap();
    let err = remote.submit(&players(), &zeca()).await.unwrap_err();

    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_rate_limit_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/players"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let remote = RestRemote::new(mock_url(&server), None).unwrap();
    let err = remote.submit(&players(), &zeca()).await.unwrap_err();

    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_timeout_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/players"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = RestClient::with_timeout(mock_url(&server), None, Duration::from_millis(50)).unwrap();
    let remote = RestRemote::from_client(client);
    let err = remote.submit(&players(), &zeca()).await.unwrap_err();

    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    // Bind and release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let url = RemoteUrl::new(format!("http://127.0.0.1:{}", port)).unwrap();

    let remote = RestRemote::new(url, None).unwrap();
    let err = remote.submit(&players(), &zeca()).await.unwrap_err();

    assert!(err.is_unavailable());
}
