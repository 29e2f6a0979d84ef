//! # Whisper Hub
//!
//! Real-time direct-message delivery server.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Conversation store (PostgreSQL or in-memory)
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use whisper_hub::config::Settings;
use whisper_hub::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    whisper_hub::telemetry::init_tracing();

    info!("Starting Whisper Hub...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        backend = ?settings.storage.backend,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
