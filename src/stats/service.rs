use futures::{future::join_all, FutureExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::identity::{
    repository::IdentityRepository, IdentityError, IdentityResolver, PlayerIdentity,
};

use super::{
    audit::AuditConnector,
    economy_mapping::EconomyMapping,
    format::{SnapshotParts, DEFAULT_DATE_FORMAT},
    models::{ResolvedStat, StatsResponse},
    rank_table::RankTable,
    repository::{CombatRepository, PermissionRepository, PluginValueRepository, SessionRepository},
    resolvers::{
        rank::assign_rank, BlockAuditResolver, CombatAggregator, EconomyResolver, RankResolver,
        SessionAggregator,
    },
    StatResolver, StatsError,
};

const DEFAULT_RESOLVER_TIMEOUT: Duration = Duration::from_secs(3);

/// Builds one statistics snapshot per request.
///
/// Identity resolution gates everything else. The statistic resolvers then
/// run concurrently inside the request's own task, so dropping the request
/// cancels them all; each one is bounded by a timeout and falls back to its
/// default on error.
pub struct StatsService {
    identity: IdentityResolver,
    resolvers: Vec<Arc<dyn StatResolver>>,
    rank_table: Arc<RankTable>,
    resolver_timeout: Duration,
    date_format: String,
}

impl StatsService {
    pub fn builder<R>(
        identity_repository: Arc<dyn IdentityRepository + Send + Sync>,
        stats_repository: Arc<R>,
    ) -> StatsServiceBuilder
    where
        R: SessionRepository
            + CombatRepository
            + PermissionRepository
            + PluginValueRepository
            + 'static,
    {
        StatsServiceBuilder::new(identity_repository, stats_repository)
    }

    pub fn resolver_names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Resolves the identifier and aggregates every statistic for it.
    /// Only identity failures are returned as errors.
    #[instrument(skip(self))]
    pub async fn player_snapshot(&self, identifier: &str) -> Result<StatsResponse, IdentityError> {
        let identity = self.identity.resolve(identifier).await?;

        let outcomes = join_all(
            self.resolvers
                .iter()
                .map(|resolver| self.run_isolated(resolver.as_ref(), &identity)),
        )
        .await;

        let default_rank = assign_rank(&self.rank_table, &[]);
        let mut parts = SnapshotParts::new(default_rank);
        for stat in outcomes {
            parts.apply(stat);
        }

        let response = parts.assemble(&identity, &self.date_format);
        info!(
            uuid = %identity.uuid,
            username = %response.username,
            rank = %response.rank,
            "Built player snapshot"
        );

        Ok(response)
    }

    async fn run_isolated(
        &self,
        resolver: &dyn StatResolver,
        identity: &PlayerIdentity,
    ) -> ResolvedStat {
        let name = resolver.name();
        // A panicking resolver degrades like a failing one
        let guarded = AssertUnwindSafe(resolver.resolve(identity)).catch_unwind();
        match timeout(self.resolver_timeout, guarded).await {
            Ok(Ok(Ok(stat))) => {
                debug!(resolver = name, "Resolver completed");
                stat
            }
            Ok(Ok(Err(err))) => {
                warn!(resolver = name, error = %err, "Resolver failed, using default");
                resolver.fallback()
            }
            Ok(Err(_)) => {
                warn!(resolver = name, "Resolver panicked, using default");
                resolver.fallback()
            }
            Err(_) => {
                let err = StatsError::Timeout {
                    resolver: name,
                    timeout_ms: self.resolver_timeout.as_millis() as u64,
                };
                warn!(resolver = name, error = %err, "Resolver timed out, using default");
                resolver.fallback()
            }
        }
    }
}

pub struct StatsServiceBuilder {
    identity_repository: Arc<dyn IdentityRepository + Send + Sync>,
    sessions: Arc<dyn SessionRepository>,
    combat: Arc<dyn CombatRepository>,
    permissions: Arc<dyn PermissionRepository>,
    plugin_values: Arc<dyn PluginValueRepository>,
    audit_connector: Option<Arc<dyn AuditConnector>>,
    rank_table: Arc<RankTable>,
    economy_mapping: Arc<EconomyMapping>,
    extra_resolvers: Vec<Arc<dyn StatResolver>>,
    resolver_timeout: Duration,
    date_format: String,
}

impl StatsServiceBuilder {
    fn new<R>(
        identity_repository: Arc<dyn IdentityRepository + Send + Sync>,
        stats_repository: Arc<R>,
    ) -> Self
    where
        R: SessionRepository
            + CombatRepository
            + PermissionRepository
            + PluginValueRepository
            + 'static,
    {
        Self {
            identity_repository,
            sessions: stats_repository.clone(),
            combat: stats_repository.clone(),
            permissions: stats_repository.clone(),
            plugin_values: stats_repository,
            audit_connector: None,
            rank_table: Arc::new(RankTable::default()),
            economy_mapping: Arc::new(EconomyMapping::default()),
            extra_resolvers: Vec::new(),
            resolver_timeout: DEFAULT_RESOLVER_TIMEOUT,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    pub fn with_audit_connector(mut self, connector: Arc<dyn AuditConnector>) -> Self {
        self.audit_connector = Some(connector);
        self
    }

    pub fn with_rank_table(mut self, rank_table: RankTable) -> Self {
        self.rank_table = Arc::new(rank_table);
        self
    }

    pub fn with_economy_mapping(mut self, economy_mapping: EconomyMapping) -> Self {
        self.economy_mapping = Arc::new(economy_mapping);
        self
    }

    /// Registers an additional resolver; it runs after the built-in ones
    /// and its result overrides theirs for the same statistic
    pub fn with_resolver(mut self, resolver: Arc<dyn StatResolver>) -> Self {
        self.extra_resolvers.push(resolver);
        self
    }

    pub fn with_resolver_timeout(mut self, resolver_timeout: Duration) -> Self {
        self.resolver_timeout = resolver_timeout;
        self
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn build(self) -> StatsService {
        let mut resolvers: Vec<Arc<dyn StatResolver>> = vec![
            Arc::new(SessionAggregator::new(self.sessions)),
            Arc::new(CombatAggregator::new(self.combat)),
            Arc::new(EconomyResolver::new(
                self.plugin_values,
                self.economy_mapping,
            )),
            Arc::new(RankResolver::new(self.permissions, self.rank_table.clone())),
            Arc::new(
                BlockAuditResolver::new(self.audit_connector)
                    .with_query_timeout(self.resolver_timeout * 4 / 5),
            ),
        ];
        resolvers.extend(self.extra_resolvers);

        StatsService {
            identity: IdentityResolver::new(self.identity_repository)
                .with_timeout(self.resolver_timeout),
            resolvers,
            rank_table: self.rank_table,
            resolver_timeout: self.resolver_timeout,
            date_format: self.date_format,
        }
    }
}
