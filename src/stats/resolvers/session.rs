use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::identity::PlayerIdentity;

use super::super::{
    models::{ResolvedStat, SessionAggregate},
    repository::SessionRepository,
    StatResolver, StatsError,
};

/// Playtime, mob kills and deaths summed over all sessions
pub struct SessionAggregator {
    repository: Arc<dyn SessionRepository>,
    clock: fn() -> DateTime<Utc>,
}

impl SessionAggregator {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self {
            repository,
            clock: Utc::now,
        }
    }

    /// Replace the time source open sessions are measured against
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl StatResolver for SessionAggregator {
    async fn resolve(&self, identity: &PlayerIdentity) -> Result<ResolvedStat, StatsError> {
        let totals = self
            .repository
            .session_totals(identity.internal_id, (self.clock)())
            .await?;
        Ok(ResolvedStat::Sessions(totals))
    }

    fn fallback(&self) -> ResolvedStat {
        ResolvedStat::Sessions(SessionAggregate::default())
    }

    fn name(&self) -> &'static str {
        "sessions"
    }
}
