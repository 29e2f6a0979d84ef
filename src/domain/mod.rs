//! # Domain Layer
//!
//! The domain layer contains the core business rules of direct messaging.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: DirectMessage, pages and summaries, repository traits
//! - **value_objects**: ConversationId, PresenceStatus
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Conversations are derived from participant pairs, never stored

pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use value_objects::*;
