use super::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side marker of which client currently owns a user's login
/// (`user_active_sessions`, one row per user, overwritten on every login).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    /// Opaque access token of the owning session.
    pub session_id: String,
    #[serde(default)]
    pub device_info: String,
    pub last_seen: DateTime<Utc>,
}

impl Record for SessionRecord {
    const TABLE: &'static str = "user_active_sessions";
}

impl SessionRecord {
    /// Column the record is upserted on.
    pub const KEY: &'static str = "user_id";

    pub fn new(user_id: &str, token: &str, device_info: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            session_id: token.to_string(),
            device_info: device_info.to_string(),
            last_seen: now,
        }
    }
}
