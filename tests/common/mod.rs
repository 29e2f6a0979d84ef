//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use axum_test::TestServer;
use futures::channel::mpsc;
use futures::StreamExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use tokio::task::JoinHandle;
use uuid::Uuid;

use whisper_hub::config::{
    CorsSettings, DatabaseSettings, HistorySettings, JwtSettings, ServerSettings, Settings,
    StorageBackend, StorageSettings, WebSocketSettings,
};
use whisper_hub::domain::{ConversationStore, DirectMessage, PresenceStatus, UserRepository};
use whisper_hub::infrastructure::repositories::InMemoryStore;
use whisper_hub::presentation::middleware::Claims;
use whisper_hub::presentation::websocket::{ConnectionActor, OutboundEnvelope, Shutdown};
use whisper_hub::startup::{build_router, AppState};

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-chars";

/// Settings for the in-memory backend
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "postgres://unused".into(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
        },
        storage: StorageSettings {
            backend: StorageBackend::Memory,
            operation_timeout_secs: 5,
        },
        jwt: JwtSettings {
            secret: TEST_SECRET.into(),
        },
        websocket: WebSocketSettings::default(),
        history: HistorySettings::default(),
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        environment: "test".into(),
    }
}

/// Sign a token the auth middleware accepts
pub fn token_for(user_id: Uuid, username: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.into(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Test application on the in-memory backend
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub server: TestServer,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(store.clone(), store.clone(), test_settings());
        let server = TestServer::new(build_router(state.clone())).unwrap();

        Self {
            state,
            store,
            server,
        }
    }

    /// Persist a message directly, bypassing the socket path
    pub async fn seed_message(&self, from: Uuid, to: Uuid, content: &str) -> DirectMessage {
        let message = DirectMessage::new(Uuid::now_v7(), from, to, content, chrono::Utc::now());
        self.store.append(&message).await.unwrap();
        message
    }

    /// Add a user to the directory with a persisted status
    pub async fn seed_user(&self, username: &str, status: PresenceStatus) -> Uuid {
        let user_id = Uuid::new_v4();
        self.store.update_status(user_id, username, status).await.unwrap();
        user_id
    }
}

/// A connection actor driven over in-process channels
pub struct TestClient {
    pub user_id: Uuid,
    inbound: mpsc::UnboundedSender<Message>,
    outbound: mpsc::UnboundedReceiver<Message>,
    pending: VecDeque<OutboundEnvelope>,
    task: JoinHandle<Shutdown>,
}

impl TestClient {
    /// Start an actor for a fresh user and wait until it is registered
    pub async fn connect(state: &AppState, username: &str) -> Self {
        Self::reconnect(state, Uuid::new_v4(), username).await
    }

    /// Start an actor for `user_id`, replacing any live connection it has
    pub async fn reconnect(state: &AppState, user_id: Uuid, username: &str) -> Self {
        let actor = ConnectionActor::new(
            user_id,
            username,
            state.router.clone(),
            state.settings.websocket.clone(),
        );

        let connection_id = actor.handle().connection_id();
        let (inbound, client_rx) = mpsc::unbounded::<Message>();
        let (server_tx, outbound) = mpsc::unbounded::<Message>();
        let task = tokio::spawn(actor.run(client_rx.map(Ok::<_, Infallible>), server_tx));

        while state.registry.current(user_id).map(|h| h.connection_id()) != Some(connection_id) {
            tokio::task::yield_now().await;
        }

        Self {
            user_id,
            inbound,
            outbound,
            pending: VecDeque::new(),
            task,
        }
    }

    pub fn send(&self, frame: serde_json::Value) {
        self.inbound
            .unbounded_send(Message::Text(frame.to_string().into()))
            .unwrap();
    }

    /// Next envelope, splitting coalesced frames
    pub async fn recv(&mut self) -> OutboundEnvelope {
        loop {
            if let Some(envelope) = self.pending.pop_front() {
                return envelope;
            }

            let frame = tokio::time::timeout(Duration::from_secs(2), self.outbound.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed");

            if let Message::Text(text) = frame {
                for line in text.as_str().lines() {
                    self.pending.push_back(serde_json::from_str(line).unwrap());
                }
            }
        }
    }

    /// Skip presence updates and return the next other envelope
    pub async fn recv_skipping_presence(&mut self) -> OutboundEnvelope {
        loop {
            match self.recv().await {
                OutboundEnvelope::PresenceUpdate(_) => continue,
                other => return other,
            }
        }
    }

    pub async fn close(self) -> Shutdown {
        self.inbound.unbounded_send(Message::Close(None)).unwrap();
        self.task.await.unwrap()
    }
}
