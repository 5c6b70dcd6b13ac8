use async_trait::async_trait;
use std::sync::Arc;

use crate::identity::PlayerIdentity;

use super::super::{
    models::{CombatCount, ResolvedStat},
    repository::CombatRepository,
    StatResolver, StatsError,
};

/// Player kills credited to the player
pub struct CombatAggregator {
    repository: Arc<dyn CombatRepository>,
}

impl CombatAggregator {
    pub fn new(repository: Arc<dyn CombatRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl StatResolver for CombatAggregator {
    async fn resolve(&self, identity: &PlayerIdentity) -> Result<ResolvedStat, StatsError> {
        let pvp_kills = self.repository.count_kills_by(&identity.uuid).await?;
        Ok(ResolvedStat::Combat(CombatCount { pvp_kills }))
    }

    fn fallback(&self) -> ResolvedStat {
        ResolvedStat::Combat(CombatCount::default())
    }

    fn name(&self) -> &'static str {
        "combat"
    }
}
