//! # Value Objects
//!
//! Immutable value types with no identity of their own.
//!
//! - **ConversationId**: ordered participant pair naming a direct conversation
//! - **PresenceStatus**: online / away / offline

mod conversation_id;
mod presence;

pub use conversation_id::{ConversationId, ConversationIdError, CONVERSATION_ID_LEN};
pub use presence::{InvalidPresenceStatus, PresenceStatus};
