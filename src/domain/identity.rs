//! Rotating client identities used to disguise outbound traffic.

use serde::{Deserialize, Serialize};

/// An outbound client identity (user-agent string plus bookkeeping).
///
/// Owned by the persistence layer; the resilience layer only holds cached
/// read-only copies and bumps the usage counter through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Store-assigned id. Built-in fallback identities use negative ids so
    /// they never collide with persisted rows.
    pub id: i64,
    /// The user-agent string sent with each request.
    pub user_agent: String,
    /// Number of requests sent under this identity.
    pub usage_count: i64,
    /// Inactive identities are excluded from rotation.
    pub active: bool,
}

impl ClientIdentity {
    pub fn new(id: i64, user_agent: impl Into<String>) -> Self {
        Self {
            id,
            user_agent: user_agent.into(),
            usage_count: 0,
            active: true,
        }
    }
}
