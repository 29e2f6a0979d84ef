//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;

use crate::application::services::{
    ConversationService, ConversationServiceImpl, UserService, UserServiceImpl,
};
use crate::config::{Settings, StorageBackend};
use crate::domain::{ConversationStore, UserRepository};
use crate::infrastructure::database;
use crate::infrastructure::repositories::{InMemoryStore, PgConversationStore, PgUserRepository};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{ConnectionRegistry, MessageRouter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConversationStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub router: Arc<MessageRouter>,
    pub conversations: Arc<dyn ConversationService>,
    pub users: Arc<dyn UserService>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the registry, router and services around the two stores.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        users: Arc<dyn UserRepository>,
        settings: Settings,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Arc::new(MessageRouter::new(
            registry.clone(),
            store.clone(),
            users.clone(),
            settings.storage.operation_timeout(),
        ));
        let conversations: Arc<dyn ConversationService> = Arc::new(ConversationServiceImpl::new(
            store.clone(),
            registry.clone(),
            settings.history.clone(),
        ));
        let users: Arc<dyn UserService> = Arc::new(UserServiceImpl::new(users, registry.clone()));

        Self {
            store,
            registry,
            router,
            conversations,
            users,
            settings: Arc::new(settings),
        }
    }

    /// State backed by a single [`InMemoryStore`] for messages and users.
    pub fn in_memory(settings: Settings) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(store.clone(), store, settings)
    }
}

/// Build the full HTTP router (routes plus tracing and CORS layers).
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);

    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let state = match settings.storage.backend {
            StorageBackend::Postgres => {
                let pool = database::create_pool(&settings.database)
                    .await
                    .context("failed to connect to PostgreSQL")?;
                tracing::info!("Database connection pool created");

                database::run_migrations(&pool)
                    .await
                    .context("failed to run database migrations")?;
                tracing::info!("Database migrations applied");

                AppState::new(
                    Arc::new(PgConversationStore::new(pool.clone())),
                    Arc::new(PgUserRepository::new(pool)),
                    settings.clone(),
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; messages are lost on restart");
                AppState::in_memory(settings.clone())
            }
        };

        let router = build_router(state);

        let addr: SocketAddr = settings
            .server_addr()
            .parse()
            .with_context(|| format!("invalid server address {}", settings.server_addr()))?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
