//! Conversation history API tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;
use uuid::Uuid;

use whisper_hub::application::dto::response::{ConversationListResponse, MessageListResponse};
use whisper_hub::domain::ConversationId;

use crate::common::{token_for, TestApp, TestClient};

fn messages_path(conversation_id: &ConversationId) -> String {
    format!("/api/v1/conversations/{}/messages", conversation_id)
}

#[tokio::test]
async fn test_history_requires_token() {
    let app = TestApp::new();
    let conversation = ConversationId::derive(Uuid::new_v4(), Uuid::new_v4());

    let response = app.server.get(&messages_path(&conversation)).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], 1008);
}

#[tokio::test]
async fn test_history_rejects_bad_token() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/v1/conversations")
        .authorization_bearer("not-a-jwt")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_history_forbidden_for_non_participant() {
    let app = TestApp::new();
    let (alice, bob, mallory) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    app.seed_message(alice, bob, "private").await;

    let response = app
        .server
        .get(&messages_path(&ConversationId::derive(alice, bob)))
        .authorization_bearer(token_for(mallory, "mallory"))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], 1004);
}

#[tokio::test]
async fn test_history_rejects_malformed_conversation_id() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/v1/conversations/not-a-conversation/messages")
        .authorization_bearer(token_for(Uuid::new_v4(), "alice"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], 1003);
}

#[tokio::test]
async fn test_history_accepts_token_query_parameter() {
    let app = TestApp::new();
    let alice = Uuid::new_v4();

    let response = app
        .server
        .get("/api/v1/conversations")
        .add_query_param("token", token_for(alice, "alice"))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_offline_message_is_read_on_fetch() {
    let app = TestApp::new();
    let mut alice = TestClient::connect(&app.state, "alice").await;
    let bob = Uuid::new_v4();

    alice.send(serde_json::json!({
        "type": "direct_message",
        "data": {"recipient_id": bob, "content": "hi", "message_id": "c1"}
    }));
    alice.recv_skipping_presence().await;
    alice.recv_skipping_presence().await;

    let response = app
        .server
        .get(&messages_path(&ConversationId::derive(alice.user_id, bob)))
        .authorization_bearer(token_for(bob, "bob"))
        .add_query_param("limit", 10)
        .await;

    response.assert_status_ok();
    let page: MessageListResponse = response.json();
    assert_eq!(page.messages.len(), 1);
    assert_eq!(page.messages[0].content, "hi");
    assert_eq!(page.messages[0].sender_id, alice.user_id.to_string());
    assert!(!page.messages[0].delivery_status.delivered);
    assert!(!page.messages[0].delivery_status.read);
    assert!(!page.has_more);
    assert_eq!(page.next_cursor, None);

    let stored = app
        .store
        .message(page.messages[0].message_id.parse().unwrap())
        .unwrap();
    assert!(stored.read);

    alice.close().await;
}

#[tokio::test]
async fn test_history_pages_backwards_with_cursor() {
    let app = TestApp::new();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    for i in 0..5 {
        app.seed_message(alice, bob, &format!("m{}", i)).await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    let path = messages_path(&ConversationId::derive(alice, bob));
    let token = token_for(alice, "alice");

    let first: MessageListResponse = app
        .server
        .get(&path)
        .authorization_bearer(&token)
        .add_query_param("limit", 3)
        .await
        .json();
    assert_eq!(
        first.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
        vec!["m4", "m3", "m2"]
    );
    assert!(first.has_more);
    let cursor = first.next_cursor.clone().unwrap();
    assert_eq!(cursor, first.messages[2].message_id);

    let second: MessageListResponse = app
        .server
        .get(&path)
        .authorization_bearer(&token)
        .add_query_param("limit", 3)
        .add_query_param("before", &cursor)
        .await
        .json();
    assert_eq!(
        second.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
        vec!["m1", "m0"]
    );
    assert!(!second.has_more);
    assert_eq!(second.next_cursor, None);
}

#[tokio::test]
async fn test_blank_and_garbage_query_values_use_defaults() {
    let app = TestApp::new();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_message(alice, bob, "hello").await;
    let path = messages_path(&ConversationId::derive(alice, bob));
    let token = token_for(alice, "alice");

    for query in ["before=&limit=", "limit=abc", "limit=-5"] {
        let response = app
            .server
            .get(&format!("{}?{}", path, query))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let page: MessageListResponse = response.json();
        assert_eq!(page.messages.len(), 1, "query {}", query);
        assert!(!page.has_more);
    }
}

#[tokio::test]
async fn test_unknown_cursor_is_bad_request() {
    let app = TestApp::new();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_message(alice, bob, "hello").await;

    let response = app
        .server
        .get(&messages_path(&ConversationId::derive(alice, bob)))
        .authorization_bearer(token_for(alice, "alice"))
        .add_query_param("before", Uuid::new_v4())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_conversations_reports_online_counterpart() {
    let app = TestApp::new();
    let bob = TestClient::connect(&app.state, "bob").await;
    let (alice, carol) = (Uuid::new_v4(), Uuid::new_v4());
    app.seed_message(bob.user_id, alice, "from bob").await;
    app.seed_message(carol, alice, "from carol").await;

    let response = app
        .server
        .get("/api/v1/conversations")
        .authorization_bearer(token_for(alice, "alice"))
        .await;

    response.assert_status_ok();
    let list: ConversationListResponse = response.json();
    assert_eq!(list.conversations.len(), 2);
    for conversation in &list.conversations {
        let expect_online = conversation.other_user.user_id == bob.user_id.to_string();
        assert_eq!(conversation.other_user.online, expect_online);
        assert_eq!(conversation.unread_count, 1);
    }

    bob.close().await;
}
