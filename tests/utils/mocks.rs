use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use playerstats::stats::{
    audit::{AuditConnection, AuditConnector},
    BlockAuditCount, CombatRepository, PermissionRepository, PermissionSignals,
    PluginValueRepository, PluginValueRow, SessionAggregate, SessionRepository, StatsError,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Statistics store whose every query fails
pub struct FailingStatsRepository;

fn unavailable() -> StatsError {
    StatsError::Repository("store unavailable".to_string())
}

#[async_trait]
impl SessionRepository for FailingStatsRepository {
    async fn session_totals(
        &self,
        _internal_id: i64,
        _now: DateTime<Utc>,
    ) -> Result<SessionAggregate, StatsError> {
        Err(unavailable())
    }
}

#[async_trait]
impl CombatRepository for FailingStatsRepository {
    async fn count_kills_by(&self, _killer_uuid: &str) -> Result<i64, StatsError> {
        Err(unavailable())
    }
}

#[async_trait]
impl PermissionRepository for FailingStatsRepository {
    async fn permission_signals(&self, _uuid: &str) -> Result<PermissionSignals, StatsError> {
        Err(unavailable())
    }
}

#[async_trait]
impl PluginValueRepository for FailingStatsRepository {
    async fn plugin_values(
        &self,
        _uuid: &str,
        _plugins: &[String],
    ) -> Result<Vec<PluginValueRow>, StatsError> {
        Err(unavailable())
    }
}

/// Block audit store keyed by display name that records how many
/// connections were opened and closed
#[derive(Default)]
pub struct MockAuditConnector {
    counts: Vec<(String, BlockAuditCount)>,
    fail_queries: bool,
    pub connects: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
}

impl MockAuditConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_player(mut self, name: &str, mined: i64, placed: i64) -> Self {
        self.counts
            .push((name.to_string(), BlockAuditCount { mined, placed }));
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct MockAuditConnection {
    counts: Vec<(String, BlockAuditCount)>,
    fail_queries: bool,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl AuditConnector for MockAuditConnector {
    async fn connect(&self) -> Result<Box<dyn AuditConnection>, StatsError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockAuditConnection {
            counts: self.counts.clone(),
            fail_queries: self.fail_queries,
            closes: self.closes.clone(),
        }))
    }
}

#[async_trait]
impl AuditConnection for MockAuditConnection {
    async fn user_ref(&mut self, name: &str) -> Result<Option<i64>, StatsError> {
        if self.fail_queries {
            return Err(StatsError::Audit("audit tables missing".to_string()));
        }
        Ok(self
            .counts
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| i as i64))
    }

    async fn action_counts(&mut self, user_ref: i64) -> Result<BlockAuditCount, StatsError> {
        Ok(self
            .counts
            .get(user_ref as usize)
            .map(|(_, count)| *count)
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<(), StatsError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
