use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::identity::PlayerIdentity;

use super::super::{
    audit::{AuditConnection, AuditConnector},
    models::{BlockAuditCount, ResolvedStat},
    StatResolver, StatsError,
};

/// Blocks broken and placed, from the separately hosted audit store.
///
/// The audit store shares no key with the primary store, so lookups go by
/// display name. Without a connector the resolver is skipped outright.
pub struct BlockAuditResolver {
    connector: Option<Arc<dyn AuditConnector>>,
    query_timeout: Duration,
}

impl BlockAuditResolver {
    pub fn new(connector: Option<Arc<dyn AuditConnector>>) -> Self {
        Self {
            connector,
            query_timeout: Duration::from_millis(2400),
        }
    }

    /// Bound on the queries of one connection. Keep it below the resolver
    /// timeout so the connection is closed before the resolver is dropped.
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    async fn count_for(
        conn: &mut dyn AuditConnection,
        display_name: &str,
    ) -> Result<BlockAuditCount, StatsError> {
        match conn.user_ref(display_name).await? {
            Some(user_ref) => conn.action_counts(user_ref).await,
            None => {
                debug!(display_name = %display_name, "Player unknown to block audit store");
                Ok(BlockAuditCount::default())
            }
        }
    }
}

#[async_trait]
impl StatResolver for BlockAuditResolver {
    async fn resolve(&self, identity: &PlayerIdentity) -> Result<ResolvedStat, StatsError> {
        let Some(connector) = &self.connector else {
            debug!("Block audit store not configured, skipping");
            return Ok(self.fallback());
        };

        let mut conn = connector.connect().await?;
        let counted = match timeout(
            self.query_timeout,
            Self::count_for(conn.as_mut(), &identity.display_name),
        )
        .await
        {
            Ok(counted) => counted,
            Err(_) => Err(StatsError::Timeout {
                resolver: self.name(),
                timeout_ms: self.query_timeout.as_millis() as u64,
            }),
        };

        // Release the connection before looking at the outcome
        if let Err(err) = conn.close().await {
            warn!(error = %err, "Failed to close block audit connection");
        }

        Ok(ResolvedStat::Blocks(counted?))
    }

    fn fallback(&self) -> ResolvedStat {
        ResolvedStat::Blocks(BlockAuditCount::default())
    }

    fn name(&self) -> &'static str {
        "block_audit"
    }
}
