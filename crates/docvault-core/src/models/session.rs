use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time-boxed grouping of uploaded documents, addressed by an opaque token.
///
/// `expires_at` is fixed at creation and never extended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session with a fresh token starting at `now`.
    pub fn new(now: DateTime<Utc>, ttl: TimeDelta) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Live iff `now < expires_at`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
