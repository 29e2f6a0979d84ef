//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **ConversationService**: history paging with read marking, conversation list
//! - **UserService**: paged user directory with live online flags

pub mod conversation_service;
pub mod user_service;

pub use conversation_service::{
    ConversationError, ConversationHistory, ConversationOverview, ConversationService,
    ConversationServiceImpl, HistoryQueryDto, OnlineUsers,
};
pub use user_service::{
    DirectoryEntry, DirectoryQueryDto, UserDirectory, UserService, UserServiceImpl,
};
