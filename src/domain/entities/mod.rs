//! # Domain Entities
//!
//! Core domain entities of the direct-messaging core.
//!
//! - **DirectMessage**: a persisted two-party message with delivery/read flags
//! - **MessagePage**: a cursor-paged slice of conversation history
//! - **ConversationSummary**: derived per-counterpart overview row
//! - **UserSummary**: one user directory row
//!
//! ## Repository Traits
//!
//! `ConversationStore` and `UserRepository` define the data access
//! contracts. They are implemented in the infrastructure layer.

mod message;
mod user;

pub use message::{ConversationStore, ConversationSummary, DirectMessage, MessagePage};
pub use user::{UserListQuery, UserPage, UserRepository, UserSummary};

#[cfg(test)]
pub use message::MockConversationStore;
#[cfg(test)]
pub use user::MockUserRepository;
