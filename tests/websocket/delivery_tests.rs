//! End-to-end delivery between connection actors sharing one registry

use pretty_assertions::assert_eq;
use serde_json::json;

use whisper_hub::domain::{ConversationId, PresenceStatus};
use whisper_hub::presentation::websocket::messages::AckStatus;
use whisper_hub::presentation::websocket::{OutboundEnvelope, Shutdown};

use crate::common::{TestApp, TestClient};

#[tokio::test]
async fn test_online_recipient_receives_push_and_sender_two_acks() {
    let app = TestApp::new();
    let mut alice = TestClient::connect(&app.state, "alice").await;
    let mut bob = TestClient::connect(&app.state, "bob").await;

    alice.send(json!({
        "type": "direct_message",
        "data": {"recipient_id": bob.user_id, "content": "hello bob", "message_id": "c-42"}
    }));

    let OutboundEnvelope::MessageAck(sent) = alice.recv_skipping_presence().await else {
        panic!("expected sent ack");
    };
    assert_eq!(sent.client_message_id, "c-42");
    assert_eq!(sent.status, AckStatus::Sent);

    let OutboundEnvelope::MessageAck(delivered) = alice.recv_skipping_presence().await else {
        panic!("expected delivered ack");
    };
    assert_eq!(delivered.status, AckStatus::Delivered);
    assert_eq!(delivered.server_message_id, sent.server_message_id);

    let OutboundEnvelope::DirectMessage(push) = bob.recv_skipping_presence().await else {
        panic!("expected pushed message");
    };
    assert_eq!(push.content, "hello bob");
    assert_eq!(push.sender_id, alice.user_id);
    assert_eq!(push.sender_username, "alice");
    assert_eq!(
        push.conversation_id,
        ConversationId::derive(alice.user_id, bob.user_id)
    );
    assert_eq!(Some(push.message_id), sent.server_message_id);

    let stored = app.store.message(push.message_id).unwrap();
    assert!(stored.delivered);
    assert!(!stored.read);

    alice.close().await;
    bob.close().await;
}

#[tokio::test]
async fn test_presence_follows_connect_and_disconnect() {
    let app = TestApp::new();
    let mut alice = TestClient::connect(&app.state, "alice").await;
    let bob = TestClient::connect(&app.state, "bob").await;
    let bob_id = bob.user_id;

    let OutboundEnvelope::PresenceUpdate(online) = alice.recv().await else {
        panic!("expected online presence");
    };
    assert_eq!((online.user_id, online.status), (bob_id, PresenceStatus::Online));
    assert_eq!(app.store.status_of(bob_id), Some(PresenceStatus::Online));

    assert_eq!(bob.close().await, Shutdown::PeerClosed);

    let OutboundEnvelope::PresenceUpdate(offline) = alice.recv().await else {
        panic!("expected offline presence");
    };
    assert_eq!((offline.user_id, offline.status), (bob_id, PresenceStatus::Offline));
    assert_eq!(app.store.status_of(bob_id), Some(PresenceStatus::Offline));
    assert!(!app.state.registry.is_connected(bob_id));

    alice.close().await;
}

#[tokio::test]
async fn test_read_receipt_reaches_sender() {
    let app = TestApp::new();
    let mut alice = TestClient::connect(&app.state, "alice").await;
    let mut bob = TestClient::connect(&app.state, "bob").await;
    let conversation = ConversationId::derive(alice.user_id, bob.user_id);
    let message = app.seed_message(alice.user_id, bob.user_id, "ping").await;

    bob.send(json!({
        "type": "read_receipt",
        "data": {
            "conversation_id": conversation.to_string(),
            "last_read_message_id": message.id.to_string()
        }
    }));

    let OutboundEnvelope::ReadReceipt(receipt) = alice.recv_skipping_presence().await else {
        panic!("expected read receipt");
    };
    assert_eq!(receipt.user_id, bob.user_id);
    assert_eq!(receipt.conversation_id, conversation);
    assert_eq!(receipt.last_read_message_id, message.id);

    alice.close().await;
    bob.close().await;
}

#[tokio::test]
async fn test_typing_indicator_is_forwarded() {
    let app = TestApp::new();
    let mut alice = TestClient::connect(&app.state, "alice").await;
    let mut bob = TestClient::connect(&app.state, "bob").await;

    alice.send(json!({
        "type": "typing_indicator",
        "data": {"recipient_id": bob.user_id, "status": "typing"}
    }));

    let OutboundEnvelope::TypingIndicator(typing) = bob.recv_skipping_presence().await else {
        panic!("expected typing indicator");
    };
    assert_eq!(typing.user_id, alice.user_id);
    assert_eq!(typing.username, "alice");

    alice.close().await;
    bob.close().await;
}

#[tokio::test]
async fn test_unknown_type_gets_error_and_connection_survives() {
    let app = TestApp::new();
    let mut alice = TestClient::connect(&app.state, "alice").await;

    alice.send(json!({"type": "group_message", "data": {}}));

    let OutboundEnvelope::Error(error) = alice.recv().await else {
        panic!("expected error envelope");
    };
    assert_eq!(error.code, 1001);
    assert_eq!(error.original_message_type, "group_message");
    assert!(app.state.registry.is_connected(alice.user_id));

    assert_eq!(alice.close().await, Shutdown::PeerClosed);
}

#[tokio::test]
async fn test_reconnect_replaces_previous_connection() {
    let app = TestApp::new();
    let first = TestClient::connect(&app.state, "alice").await;
    let user_id = first.user_id;

    let second = TestClient::reconnect(&app.state, user_id, "alice").await;

    // The replaced connection's teardown must not evict its successor
    first.close().await;
    assert!(app.state.registry.is_connected(user_id));
    assert_eq!(app.store.status_of(user_id), Some(PresenceStatus::Online));

    second.close().await;
    assert!(!app.state.registry.is_connected(user_id));
    assert_eq!(app.store.status_of(user_id), Some(PresenceStatus::Offline));
}
