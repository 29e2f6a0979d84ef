//! # Whisper Hub Library
//!
//! Real-time direct messaging between pairs of users:
//! - WebSocket delivery with sent/delivered acknowledgements
//! - Typing indicators, read receipts and presence fan-out
//! - Cursor-paged conversation history over REST
//! - PostgreSQL or in-memory persistence
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Messages, conversation identifiers and repository traits
//! - **Application Layer**: Conversation service and DTOs
//! - **Infrastructure Layer**: Store implementations, database and metrics
//! - **Presentation Layer**: HTTP handlers, middleware and the WebSocket layer
//!
//! ## Module Structure
//!
//! ```text
//! whisper_hub/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities, value objects, and traits
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Store, database and metrics implementations
//! +-- presentation/   HTTP routes and WebSocket delivery
//! +-- shared/         Common utilities (errors, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
