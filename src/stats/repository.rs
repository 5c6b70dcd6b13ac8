use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument};

use super::{
    models::{KillRecord, PermissionSignals, PluginValueRow, SessionAggregate, SessionRecord},
    StatsError,
};

/// Session rows of the primary store, keyed by the store-local player id
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Sums every session of the player. Sessions without an end are counted
    /// up to `now`.
    async fn session_totals(
        &self,
        internal_id: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionAggregate, StatsError>;
}

/// Player-kill events
#[async_trait]
pub trait CombatRepository: Send + Sync {
    async fn count_kills_by(&self, killer_uuid: &str) -> Result<i64, StatsError>;
}

/// Primary group and `group.<name>` grants of the permission plugin
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn permission_signals(&self, uuid: &str) -> Result<PermissionSignals, StatsError>;
}

/// Generic per-plugin metric values
#[async_trait]
pub trait PluginValueRepository: Send + Sync {
    /// Rows for the player whose plugin name (lowercased) is in `plugins`
    async fn plugin_values(
        &self,
        uuid: &str,
        plugins: &[String],
    ) -> Result<Vec<PluginValueRow>, StatsError>;
}

#[derive(Debug, Clone)]
struct PermissionGrant {
    uuid: String,
    permission: String,
    value: bool,
}

/// In-memory implementation of every statistics store, for development and
/// testing. Data is lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryStatsRepository {
    sessions: Mutex<Vec<SessionRecord>>,
    kills: Mutex<Vec<KillRecord>>,
    primary_groups: Mutex<HashMap<String, String>>,
    grants: Mutex<Vec<PermissionGrant>>,
    plugin_values: Mutex<Vec<PluginValueRow>>,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&self, session: SessionRecord) {
        self.sessions.lock().unwrap().push(session);
    }

    pub fn add_kill(&self, kill: KillRecord) {
        self.kills.lock().unwrap().push(kill);
    }

    pub fn set_primary_group(&self, uuid: &str, group: &str) {
        self.primary_groups
            .lock()
            .unwrap()
            .insert(uuid.to_string(), group.to_string());
    }

    pub fn grant_permission(&self, uuid: &str, permission: &str, value: bool) {
        self.grants.lock().unwrap().push(PermissionGrant {
            uuid: uuid.to_string(),
            permission: permission.to_string(),
            value,
        });
    }

    pub fn add_plugin_value(&self, row: PluginValueRow) {
        self.plugin_values.lock().unwrap().push(row);
    }
}

#[async_trait]
impl SessionRepository for InMemoryStatsRepository {
    #[instrument(skip(self))]
    async fn session_totals(
        &self,
        internal_id: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionAggregate, StatsError> {
        let sessions = self.sessions.lock().unwrap();
        let totals = sessions
            .iter()
            .filter(|s| s.internal_id == internal_id)
            .fold(SessionAggregate::default(), |mut acc, s| {
                acc.total_playtime_ms += s.duration_ms(now);
                acc.mob_kills += s.mob_kills;
                acc.deaths += s.deaths;
                acc
            });

        debug!(internal_id, ?totals, "Summed sessions in memory");
        Ok(totals)
    }
}

#[async_trait]
impl CombatRepository for InMemoryStatsRepository {
    #[instrument(skip(self))]
    async fn count_kills_by(&self, killer_uuid: &str) -> Result<i64, StatsError> {
        let kills = self.kills.lock().unwrap();
        let count = kills
            .iter()
            .filter(|k| k.killer_uuid.eq_ignore_ascii_case(killer_uuid))
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl PermissionRepository for InMemoryStatsRepository {
    #[instrument(skip(self))]
    async fn permission_signals(&self, uuid: &str) -> Result<PermissionSignals, StatsError> {
        let primary_group = self.primary_groups.lock().unwrap().get(uuid).cloned();
        let group_grants = self
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.uuid == uuid && g.value)
            .filter_map(|g| g.permission.strip_prefix("group."))
            .map(str::to_string)
            .collect();

        Ok(PermissionSignals {
            primary_group,
            group_grants,
        })
    }
}

#[async_trait]
impl PluginValueRepository for InMemoryStatsRepository {
    #[instrument(skip(self, plugins))]
    async fn plugin_values(
        &self,
        uuid: &str,
        plugins: &[String],
    ) -> Result<Vec<PluginValueRow>, StatsError> {
        let rows = self.plugin_values.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.player_uuid == uuid)
            .filter(|r| plugins.contains(&r.plugin.trim().to_lowercase()))
            .cloned()
            .collect())
    }
}
