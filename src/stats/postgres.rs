use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, instrument, warn};

use super::{
    models::{PermissionSignals, PluginValueRow, SessionAggregate},
    repository::{CombatRepository, PermissionRepository, PluginValueRepository, SessionRepository},
    StatsError,
};
use crate::identity::repository::millis_to_datetime;

/// PostgreSQL implementation of the statistics stores.
///
/// Sessions, kills and plugin values live in the analytics plugin's `plan_*`
/// tables, ranks in the permission plugin's `luckperms_*` tables.
pub struct PostgresStatsRepository {
    pool: PgPool,
}

impl PostgresStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn repository_error(context: &'static str) -> impl Fn(sqlx::Error) -> StatsError {
    move |e| {
        warn!(error = %e, "{}", context);
        StatsError::Repository(format!("{}: {}", context, e))
    }
}

#[async_trait]
impl SessionRepository for PostgresStatsRepository {
    #[instrument(skip(self))]
    async fn session_totals(
        &self,
        internal_id: i64,
        now: DateTime<Utc>,
    ) -> Result<SessionAggregate, StatsError> {
        debug!(internal_id, "Summing sessions in database");

        // session_end of 0 or NULL marks a session that is still running
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(GREATEST(COALESCE(NULLIF(session_end, 0), $2) - session_start, 0)), 0)::BIGINT AS playtime,
                COALESCE(SUM(mob_kills), 0)::BIGINT AS mob_kills,
                COALESCE(SUM(deaths), 0)::BIGINT AS deaths
            FROM plan_sessions
            WHERE user_id = $1
            "#,
        )
        .bind(internal_id)
        .bind(now.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(repository_error("Failed to sum sessions"))?;

        let decode = repository_error("Failed to decode session totals");
        Ok(SessionAggregate {
            total_playtime_ms: row.try_get("playtime").map_err(&decode)?,
            mob_kills: row.try_get("mob_kills").map_err(&decode)?,
            deaths: row.try_get("deaths").map_err(&decode)?,
        })
    }
}

#[async_trait]
impl CombatRepository for PostgresStatsRepository {
    #[instrument(skip(self))]
    async fn count_kills_by(&self, killer_uuid: &str) -> Result<i64, StatsError> {
        debug!(killer_uuid = %killer_uuid, "Counting kills in database");

        let row = sqlx::query("SELECT COUNT(*) AS kills FROM plan_kills WHERE killer_uuid = $1")
            .bind(killer_uuid)
            .fetch_one(&self.pool)
            .await
            .map_err(repository_error("Failed to count kills"))?;

        row.try_get("kills")
            .map_err(repository_error("Failed to decode kill count"))
    }
}

#[async_trait]
impl PermissionRepository for PostgresStatsRepository {
    #[instrument(skip(self))]
    async fn permission_signals(&self, uuid: &str) -> Result<PermissionSignals, StatsError> {
        debug!(uuid = %uuid, "Fetching permission signals from database");

        let primary_group: Option<String> =
            sqlx::query_scalar("SELECT primary_group FROM luckperms_players WHERE uuid = $1")
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await
                .map_err(repository_error("Failed to fetch primary group"))?;

        let group_grants: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT SUBSTRING(permission FROM 7)
            FROM luckperms_user_permissions
            WHERE uuid = $1 AND value = TRUE AND permission LIKE 'group.%'
            ORDER BY id
            "#,
        )
        .bind(uuid)
        .fetch_all(&self.pool)
        .await
        .map_err(repository_error("Failed to fetch group grants"))?;

        Ok(PermissionSignals {
            primary_group,
            group_grants,
        })
    }
}

#[async_trait]
impl PluginValueRepository for PostgresStatsRepository {
    #[instrument(skip(self, plugins))]
    async fn plugin_values(
        &self,
        uuid: &str,
        plugins: &[String],
    ) -> Result<Vec<PluginValueRow>, StatsError> {
        debug!(uuid = %uuid, plugin_count = plugins.len(), "Fetching plugin values from database");

        let rows = sqlx::query(
            r#"
            SELECT
                pl.name AS plugin,
                pr.name AS metric,
                v.uuid AS player_uuid,
                COALESCE(v.double_value, v.long_value::DOUBLE PRECISION) AS numeric_value,
                v.string_value AS text_value,
                pl.last_updated AS written_at
            FROM plan_extension_user_values v
            JOIN plan_extension_providers pr ON pr.id = v.provider_id
            JOIN plan_extension_plugins pl ON pl.id = pr.plugin_id
            WHERE v.uuid = $1 AND LOWER(pl.name) = ANY($2)
            "#,
        )
        .bind(uuid)
        .bind(plugins)
        .fetch_all(&self.pool)
        .await
        .map_err(repository_error("Failed to fetch plugin values"))?;

        rows.iter()
            .map(|row| {
                Ok(PluginValueRow {
                    plugin: row.try_get("plugin")?,
                    metric: row.try_get("metric")?,
                    player_uuid: row.try_get("player_uuid")?,
                    numeric_value: row.try_get("numeric_value")?,
                    text_value: row.try_get("text_value")?,
                    written_at: millis_to_datetime(row.try_get("written_at")?),
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(repository_error("Failed to decode plugin values"))
    }
}
