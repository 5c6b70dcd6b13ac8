use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::identity::PlayerIdentity;

use super::super::{
    economy_mapping::EconomyMapping,
    models::{EconomyBalance, ResolvedStat},
    repository::PluginValueRepository,
    StatResolver, StatsError,
};

/// Latest currency balance found in the plugin-value store
pub struct EconomyResolver {
    repository: Arc<dyn PluginValueRepository>,
    mapping: Arc<EconomyMapping>,
}

impl EconomyResolver {
    pub fn new(repository: Arc<dyn PluginValueRepository>, mapping: Arc<EconomyMapping>) -> Self {
        Self {
            repository,
            mapping,
        }
    }
}

#[async_trait]
impl StatResolver for EconomyResolver {
    async fn resolve(&self, identity: &PlayerIdentity) -> Result<ResolvedStat, StatsError> {
        let rows = self
            .repository
            .plugin_values(&identity.uuid, &self.mapping.plugin_names())
            .await?;

        let amount = match self.mapping.select_balance(&rows) {
            Some(value) => value.trunc() as i64,
            None => {
                debug!(uuid = %identity.uuid, candidates = rows.len(), "No usable balance row");
                0
            }
        };

        Ok(ResolvedStat::Economy(EconomyBalance { amount }))
    }

    fn fallback(&self) -> ResolvedStat {
        ResolvedStat::Economy(EconomyBalance::default())
    }

    fn name(&self) -> &'static str {
        "economy"
    }
}
