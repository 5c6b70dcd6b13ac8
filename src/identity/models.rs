use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical identity of a player in the primary store.
///
/// Resolved fresh for every request and never mutated afterwards; every
/// statistic resolver joins on one of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    /// Dashed 36-char uuid as stored
    pub uuid: String,
    pub display_name: String,
    /// Store-local numeric id, the join key for session rows
    pub internal_id: i64,
    pub registered_at: DateTime<Utc>,
}

impl PlayerIdentity {
    pub fn new(
        uuid: impl Into<String>,
        display_name: impl Into<String>,
        internal_id: i64,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            display_name: display_name.into(),
            internal_id,
            registered_at,
        }
    }
}
