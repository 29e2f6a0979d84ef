//! Repository Implementations
//!
//! Implementations of the domain repository traits.
//!
//! - **PgConversationStore** - direct messages with keyset pagination
//! - **PgUserRepository** - `users.status` upserts and the user directory
//! - **InMemoryStore** - process-local implementation of both contracts
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgConversationStore, PgUserRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let store = PgConversationStore::new(pool.clone());
//!     let users = PgUserRepository::new(pool);
//! }
//! ```

pub mod memory_repository;
pub mod message_repository;
pub mod user_repository;

pub use memory_repository::InMemoryStore;
pub use message_repository::PgConversationStore;
pub use user_repository::PgUserRepository;
