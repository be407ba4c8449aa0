//! Integration tests for the authenticated request pipeline

use std::sync::Arc;

use libris_client::models::{ApiRequest, Config, TokenPair};
use libris_client::{ApiClient, AppError, MemorySessionStore, RefreshError, SessionStore};
use mockito::{Matcher, Server, ServerGuard};
use reqwest::StatusCode;
use serde_json::json;

fn config_for(server: &ServerGuard, single_flight: bool) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}/api/", server.url());
    config.session.single_flight = single_flight;
    config
}

fn client_with(config: &Config, store: Arc<MemorySessionStore>) -> ApiClient {
    ApiClient::new(config, store).expect("client")
}

fn signed_in(access: &str, refresh: &str) -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::with_tokens(TokenPair::new(access, refresh)))
}

fn refreshed_body(access: &str, refresh: &str) -> String {
    json!({ "data": { "accessToken": access, "refreshToken": refresh } }).to_string()
}

#[tokio::test]
async fn attaches_stored_access_token() {
    //* Given
    let mut server = Server::new_async().await;
    let profile = server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer A1")
        .with_status(200)
        .with_body(r#"{"data":{"name":"Reader"}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_with(&config_for(&server, true), signed_in("A1", "R1"));

    //* When
    let response = client.get("profile").await.expect("profile");

    //* Then
    profile.assert_async().await;
    let data: serde_json::Value = response.data().unwrap();
    assert_eq!(data["name"], "Reader");
}

#[tokio::test]
async fn expired_token_refreshes_and_resends_once() {
    //* Given
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .match_body(Matcher::Json(json!({ "refreshToken": "R1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(refreshed_body("A2", "R2"))
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body(r#"{"data":{"id":1}}"#)
        .expect(1)
        .create_async()
        .await;

    let store = signed_in("A1", "R1");
    let client = client_with(&config_for(&server, true), Arc::clone(&store));

    //* When
    let response = client.get("/profile").await.expect("resend should succeed");

    //* Then
    rejected.assert_async().await;
    refresh.assert_async().await;
    accepted.assert_async().await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(store.tokens().await, Some(TokenPair::new("A2", "R2")));
}

#[tokio::test]
async fn refresh_without_single_flight() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .with_status(200)
        .with_body(refreshed_body("A2", "R2"))
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let store = signed_in("A1", "R1");
    let client = client_with(&config_for(&server, false), Arc::clone(&store));

    //* When
    let result = client.get("profile").await;

    //* Then
    refresh.assert_async().await;
    assert!(result.is_ok());
    assert_eq!(store.refresh_token().await.as_deref(), Some("R2"));
}

#[tokio::test]
async fn second_401_after_refresh_is_terminal() {
    //* Given
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .with_status(200)
        .with_body(refreshed_body("A2", "R2"))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/api/profile")
        .match_header("authorization", "Bearer A2")
        .with_status(401)
        .with_body("still unauthorized")
        .expect(1)
        .create_async()
        .await;

    let client = client_with(&config_for(&server, true), signed_in("A1", "R1"));

    //* When
    let err = client.get("profile").await.unwrap_err();

    //* Then
    first.assert_async().await;
    refresh.assert_async().await;
    second.assert_async().await;
    assert!(err.is_unauthorized());
    assert!(matches!(err, AppError::Status { ref body, .. } if body == "still unauthorized"));
}

#[tokio::test]
async fn no_tokens_fails_without_refresh_call() {
    //* Given
    let mut server = Server::new_async().await;
    let profile = server
        .mock("GET", "/api/profile")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .expect(0)
        .create_async()
        .await;

    let client = client_with(
        &config_for(&server, true),
        Arc::new(MemorySessionStore::new()),
    );

    //* When
    let err = client.get("profile").await.unwrap_err();

    //* Then
    profile.assert_async().await;
    refresh.assert_async().await;
    assert!(matches!(
        err,
        AppError::Refresh(RefreshError::MissingRefreshToken)
    ));
    assert!(err.requires_login());
}

#[tokio::test]
async fn refresh_error_replaces_original_401() {
    //* Given
    let mut server = Server::new_async().await;
    let profile = server
        .mock("GET", "/api/profile")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .with_status(500)
        .with_body("refresh exploded")
        .expect(1)
        .create_async()
        .await;

    let store = signed_in("A1", "R1");
    let client = client_with(&config_for(&server, true), Arc::clone(&store));

    //* When
    let err = client.get("profile").await.unwrap_err();

    //* Then
    profile.assert_async().await;
    refresh.assert_async().await;
    match err {
        AppError::Refresh(RefreshError::Rejected { status, body }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "refresh exploded");
        }
        other => panic!("expected refresh rejection, got {other:?}"),
    }
    assert_eq!(store.tokens().await, Some(TokenPair::new("A1", "R1")));
}

#[tokio::test]
async fn malformed_refresh_body_leaves_store_untouched() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/profile")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("POST", "/api/auth/refresh-token")
        .with_status(200)
        .with_body(r#"{"data":{"accessToken":"A2"}}"#)
        .create_async()
        .await;

    let store = signed_in("A1", "R1");
    let client = client_with(&config_for(&server, true), Arc::clone(&store));

    //* When
    let err = client.get("profile").await.unwrap_err();

    //* Then
    assert!(matches!(
        err,
        AppError::Refresh(RefreshError::MalformedBody(_))
    ));
    assert_eq!(store.tokens().await, Some(TokenPair::new("A1", "R1")));
}

#[tokio::test]
async fn non_401_errors_do_not_refresh() {
    for status in [400_usize, 403, 404, 500, 503] {
        //* Given
        let mut server = Server::new_async().await;
        let books = server
            .mock("GET", "/api/books")
            .with_status(status)
            .with_body("nope")
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/auth/refresh-token")
            .expect(0)
            .create_async()
            .await;

        let client = client_with(&config_for(&server, true), signed_in("A1", "R1"));

        //* When
        let err = client.get("books").await.unwrap_err();

        //* Then
        books.assert_async().await;
        refresh.assert_async().await;
        assert_eq!(err.status_code().map(|s| s.as_u16() as usize), Some(status));
        assert!(!err.requires_login());
    }
}

#[tokio::test]
async fn transport_failure_does_not_refresh() {
    //* Given
    let mut server = Server::new_async().await;
    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .expect(0)
        .create_async()
        .await;

    // Nothing listens on port 1; the refresh endpoint is the mock server.
    let mut config = Config::default();
    config.api.base_url = "http://127.0.0.1:1/api/".into();
    config.api.refresh_path = format!("{}/auth/refresh-token", server.url());
    let client = client_with(&config, signed_in("A1", "R1"));

    //* When
    let err = client.get("profile").await.unwrap_err();

    //* Then
    refresh.assert_async().await;
    assert!(matches!(err, AppError::Transport(_)));
}

#[tokio::test]
async fn post_body_is_resent_after_refresh() {
    //* Given
    let mut server = Server::new_async().await;
    let body = json!({ "bookId": 42, "readerId": 7 });
    server
        .mock("POST", "/api/borrow-receipts")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("POST", "/api/auth/refresh-token")
        .with_status(200)
        .with_body(refreshed_body("A2", "R2"))
        .create_async()
        .await;
    let created = server
        .mock("POST", "/api/borrow-receipts")
        .match_header("authorization", "Bearer A2")
        .match_body(Matcher::Json(body.clone()))
        .with_status(201)
        .with_body(r#"{"data":{"id":99}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_with(&config_for(&server, true), signed_in("A1", "R1"));

    //* When
    let response = client
        .post_json("borrow-receipts", &body)
        .await
        .expect("created");

    //* Then
    created.assert_async().await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn custom_headers_survive_resend() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/reports/export")
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .create_async()
        .await;
    server
        .mock("POST", "/api/auth/refresh-token")
        .with_status(200)
        .with_body(refreshed_body("A2", "R2"))
        .create_async()
        .await;
    let export = server
        .mock("GET", "/api/reports/export")
        .match_header("authorization", "Bearer A2")
        .match_header("accept", "application/pdf")
        .with_status(200)
        .with_body("%PDF-1.7")
        .expect(1)
        .create_async()
        .await;

    let client = client_with(&config_for(&server, true), signed_in("A1", "R1"));
    let request = ApiRequest::get("reports/export").header(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/pdf"),
    );

    //* When
    let response = client.send(request).await.expect("export");

    //* Then
    export.assert_async().await;
    assert_eq!(response.body, b"%PDF-1.7");
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", Matcher::Regex(r"^/api/items/\d+$".into()))
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .with_status(200)
        .with_body(refreshed_body("A2", "R2"))
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", Matcher::Regex(r"^/api/items/\d+$".into()))
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let store = signed_in("A1", "R1");
    let client = client_with(&config_for(&server, true), Arc::clone(&store));

    //* When
    let client = &client;
    let results = futures::future::join_all(
        (0..4).map(|i| async move { client.get(&format!("items/{i}")).await }),
    )
    .await;

    //* Then
    refresh.assert_async().await;
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(store.tokens().await, Some(TokenPair::new("A2", "R2")));
}

#[tokio::test]
async fn foreign_origin_gets_no_credentials_and_no_refresh() {
    //* Given
    let mut server = Server::new_async().await;
    let mut foreign = Server::new_async().await;
    let collect = foreign
        .mock("GET", "/collect")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .expect(0)
        .create_async()
        .await;

    let store = signed_in("A1", "R1");
    let client = client_with(&config_for(&server, true), Arc::clone(&store));

    //* When
    let err = client
        .send(ApiRequest::get(format!("{}/collect", foreign.url())))
        .await
        .unwrap_err();

    //* Then
    collect.assert_async().await;
    refresh.assert_async().await;
    assert!(err.is_unauthorized());
    assert_eq!(store.tokens().await, Some(TokenPair::new("A1", "R1")));
}

#[tokio::test]
async fn absolute_url_on_base_origin_is_authenticated() {
    //* Given
    let mut server = Server::new_async().await;
    let covers = server
        .mock("GET", "/static/covers/42.png")
        .match_header("authorization", "Bearer A1")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = client_with(&config_for(&server, true), signed_in("A1", "R1"));

    //* When
    let result = client
        .get(&format!("{}/static/covers/42.png", server.url()))
        .await;

    //* Then
    covers.assert_async().await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn concurrent_401s_refresh_independently_without_single_flight() {
    //* Given
    let mut server = Server::new_async().await;
    server
        .mock("GET", Matcher::Regex(r"^/api/items/\d+$".into()))
        .match_header("authorization", "Bearer A1")
        .with_status(401)
        .expect(4)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .with_status(200)
        .with_body(refreshed_body("A2", "R2"))
        .expect(4)
        .create_async()
        .await;
    server
        .mock("GET", Matcher::Regex(r"^/api/items/\d+$".into()))
        .match_header("authorization", "Bearer A2")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let store = signed_in("A1", "R1");
    let client = client_with(&config_for(&server, false), Arc::clone(&store));

    //* When
    // Every request attaches A1 before any response arrives, so all four see a 401.
    let client = &client;
    let results = futures::future::join_all(
        (0..4).map(|i| async move { client.get(&format!("items/{i}")).await }),
    )
    .await;

    //* Then
    refresh.assert_async().await;
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(store.tokens().await, Some(TokenPair::new("A2", "R2")));
}
