//! Request DTOs
//!
//! Query-string shapes accepted by the REST endpoints. Numeric parameters
//! arrive as raw strings; anything that does not parse falls back to the
//! server default instead of failing the request.

use serde::Deserialize;

use crate::application::services::{DirectoryQueryDto, HistoryQueryDto};

/// `GET /api/v1/conversations/{conversation_id}/messages` query
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Message id to page backwards from
    pub before: Option<String>,
    pub limit: Option<String>,
}

impl From<HistoryQuery> for HistoryQueryDto {
    fn from(query: HistoryQuery) -> Self {
        Self {
            before: query.before,
            limit: lenient(query.limit.as_deref()),
        }
    }
}

/// `GET /api/v1/users` query
#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Case-insensitive username substring
    pub search: Option<String>,
}

impl From<UsersQuery> for DirectoryQueryDto {
    fn from(query: UsersQuery) -> Self {
        Self {
            page: lenient(query.page.as_deref()),
            limit: lenient(query.limit.as_deref()),
            search: query
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

fn lenient(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse().ok())
}
