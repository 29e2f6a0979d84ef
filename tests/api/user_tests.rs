//! User directory API tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use whisper_hub::application::dto::response::UserListResponse;
use whisper_hub::domain::PresenceStatus;

use crate::common::{token_for, TestApp, TestClient};

#[tokio::test]
async fn test_users_requires_token() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/users").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], 1008);
}

#[tokio::test]
async fn test_users_excludes_caller_and_flags_online() {
    let app = TestApp::new();
    let alice = app.seed_user("alice", PresenceStatus::Online).await;
    let bob = app.seed_user("bob", PresenceStatus::Away).await;
    app.seed_user("carol", PresenceStatus::Offline).await;
    let bob_client = TestClient::reconnect(&app.state, bob, "bob").await;

    let response = app
        .server
        .get("/api/v1/users")
        .authorization_bearer(token_for(alice, "alice"))
        .await;

    response.assert_status_ok();
    let list: UserListResponse = response.json();
    let names: Vec<&str> = list.users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["bob", "carol"]);
    assert!(list.users[0].online);
    assert!(!list.users[1].online);
    assert_eq!(list.users[1].status, "offline");
    assert_eq!(list.pagination.total, 2);
    assert_eq!(list.pagination.page, 1);
    assert_eq!(list.pagination.limit, 20);
    assert_eq!(list.pagination.next_page, None);

    bob_client.close().await;
}

#[tokio::test]
async fn test_users_search_and_paging() {
    let app = TestApp::new();
    let viewer = app.seed_user("viewer", PresenceStatus::Online).await;
    for name in ["anna", "joanna", "hannah", "zed"] {
        app.seed_user(name, PresenceStatus::Offline).await;
    }
    let token = token_for(viewer, "viewer");

    let first: UserListResponse = app
        .server
        .get("/api/v1/users?search=ANN&limit=2")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(
        first.users.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(),
        vec!["anna", "hannah"]
    );
    assert_eq!(first.pagination.total, 3);
    assert_eq!(first.pagination.next_page, Some(2));

    let second: UserListResponse = app
        .server
        .get("/api/v1/users?search=ANN&limit=2&page=2")
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(
        second.users.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(),
        vec!["joanna"]
    );
    assert_eq!(second.pagination.next_page, None);
}

#[tokio::test]
async fn test_users_garbage_paging_values_use_defaults() {
    let app = TestApp::new();
    let viewer = app.seed_user("viewer", PresenceStatus::Online).await;
    app.seed_user("bob", PresenceStatus::Offline).await;

    let response = app
        .server
        .get("/api/v1/users?page=&limit=abc&search=")
        .authorization_bearer(token_for(viewer, "viewer"))
        .await;

    response.assert_status_ok();
    let list: UserListResponse = response.json();
    assert_eq!(list.users.len(), 1);
    assert_eq!(list.pagination.page, 1);
    assert_eq!(list.pagination.limit, 20);
}
