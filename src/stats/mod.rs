pub mod audit;
pub mod economy_mapping;
pub mod format;
pub mod handlers;
pub mod postgres;
pub mod rank_table;
pub mod resolvers;
pub mod service;

mod errors;
pub mod models;
pub mod repository;

pub use errors::StatsError;
pub use models::*;
pub use postgres::PostgresStatsRepository;
pub use repository::{
    CombatRepository, InMemoryStatsRepository, PermissionRepository, PluginValueRepository,
    SessionRepository,
};
pub use service::{StatsService, StatsServiceBuilder};

use async_trait::async_trait;

use crate::identity::PlayerIdentity;

/// One independent statistic of a player snapshot.
///
/// Resolvers run concurrently; a failed or slow resolver is replaced by its
/// `fallback` without affecting the others.
#[async_trait]
pub trait StatResolver: Send + Sync {
    async fn resolve(&self, identity: &PlayerIdentity) -> Result<ResolvedStat, StatsError>;

    /// Value used when `resolve` errors or times out
    fn fallback(&self) -> ResolvedStat;

    fn name(&self) -> &'static str;
}
