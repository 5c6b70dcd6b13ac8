use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{PgPool, Row};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::{errors::IdentityError, models::PlayerIdentity};

/// Read access to the player registry of the primary store
#[async_trait]
pub trait IdentityRepository {
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<PlayerIdentity>, IdentityError>;

    /// Exact name match. A name can be reused across accounts, so the most
    /// recently registered account wins.
    async fn find_latest_by_name(&self, name: &str)
        -> Result<Option<PlayerIdentity>, IdentityError>;
}

/// In-memory registry for development and testing
pub struct InMemoryIdentityRepository {
    players: Mutex<Vec<PlayerIdentity>>,
    lookups: AtomicUsize,
}

impl Default for InMemoryIdentityRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityRepository {
    pub fn new() -> Self {
        Self::with_players(Vec::new())
    }

    pub fn with_players(players: Vec<PlayerIdentity>) -> Self {
        Self {
            players: Mutex::new(players),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of lookups served so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    #[instrument(skip(self))]
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<PlayerIdentity>, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let players = self.players.lock().unwrap();
        let found = players
            .iter()
            .find(|p| p.uuid.eq_ignore_ascii_case(uuid))
            .cloned();

        debug!(uuid = %uuid, found = found.is_some(), "Looked up player by uuid in memory");
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn find_latest_by_name(
        &self,
        name: &str,
    ) -> Result<Option<PlayerIdentity>, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let players = self.players.lock().unwrap();
        let found = players
            .iter()
            .filter(|p| p.display_name == name)
            .max_by_key(|p| (p.registered_at, p.internal_id))
            .cloned();

        debug!(name = %name, found = found.is_some(), "Looked up player by name in memory");
        Ok(found)
    }
}

/// PostgreSQL registry backed by the analytics plugin's `plan_users` table
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn identity_from_row(
        row: &sqlx::postgres::PgRow,
    ) -> Result<PlayerIdentity, IdentityError> {
        let decode = |e: sqlx::Error| {
            warn!(error = %e, "Failed to decode player row");
            IdentityError::Repository(e.to_string())
        };
        let registered_ms: i64 = row.try_get("registered").map_err(decode)?;
        Ok(PlayerIdentity {
            uuid: row.try_get("uuid").map_err(decode)?,
            display_name: row.try_get("name").map_err(decode)?,
            internal_id: row.try_get::<i32, _>("id").map_err(decode)? as i64,
            registered_at: millis_to_datetime(registered_ms),
        })
    }
}

pub(crate) fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    #[instrument(skip(self))]
    async fn find_by_uuid(&self, uuid: &str) -> Result<Option<PlayerIdentity>, IdentityError> {
        debug!(uuid = %uuid, "Fetching player by uuid from database");

        let row = sqlx::query("SELECT id, uuid, name, registered FROM plan_users WHERE uuid = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, uuid = %uuid, "Failed to fetch player by uuid");
                IdentityError::Repository(e.to_string())
            })?;

        row.as_ref().map(Self::identity_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn find_latest_by_name(
        &self,
        name: &str,
    ) -> Result<Option<PlayerIdentity>, IdentityError> {
        debug!(name = %name, "Fetching latest player by name from database");

        let row = sqlx::query(
            "SELECT id, uuid, name, registered FROM plan_users WHERE name = $1 ORDER BY registered DESC, id DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, name = %name, "Failed to fetch player by name");
            IdentityError::Repository(e.to_string())
        })?;

        row.as_ref().map(Self::identity_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(uuid: &str, name: &str, id: i64, registered_ms: i64) -> PlayerIdentity {
        PlayerIdentity::new(uuid, name, id, millis_to_datetime(registered_ms))
    }

    #[tokio::test]
    async fn finds_player_by_uuid_ignoring_case() {
        let repo = InMemoryIdentityRepository::with_players(vec![player(
            "069a79f4-44e9-4726-a5be-fca90e38aaf5",
            "Notch",
            1,
            1_000,
        )]);

        let found = repo
            .find_by_uuid("069A79F4-44E9-4726-A5BE-FCA90E38AAF5")
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.display_name), Some("Notch".to_string()));
        assert_eq!(repo.lookup_count(), 1);
    }

    #[tokio::test]
    async fn reused_name_resolves_to_latest_registration() {
        let repo = InMemoryIdentityRepository::with_players(vec![
            player("00000000-0000-0000-0000-000000000002", "Steve", 2, 5_000),
            player("00000000-0000-0000-0000-000000000001", "Steve", 1, 1_000),
        ]);

        let found = repo.find_latest_by_name("Steve").await.unwrap().unwrap();
        assert_eq!(found.internal_id, 2);
    }

    #[tokio::test]
    async fn equal_registration_times_prefer_the_newer_row() {
        let repo = InMemoryIdentityRepository::with_players(vec![
            player("00000000-0000-0000-0000-000000000007", "Alex", 7, 1_000),
            player("00000000-0000-0000-0000-000000000003", "Alex", 3, 1_000),
        ]);

        let found = repo.find_latest_by_name("Alex").await.unwrap().unwrap();
        assert_eq!(found.internal_id, 7);
    }

    #[tokio::test]
    async fn name_match_is_exact() {
        let repo = InMemoryIdentityRepository::with_players(vec![player(
            "00000000-0000-0000-0000-000000000001",
            "Steve",
            1,
            1_000,
        )]);

        assert!(repo.find_latest_by_name("steve").await.unwrap().is_none());
    }

    #[test]
    fn converts_epoch_millis() {
        let at = millis_to_datetime(1_700_000_000_000);
        assert_eq!(at.timestamp(), 1_700_000_000);
    }
}
