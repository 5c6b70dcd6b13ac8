use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use playerstats::{
    identity::repository::{IdentityRepository, InMemoryIdentityRepository},
    router,
    stats::{
        audit::AuditConnector, InMemoryStatsRepository, KillRecord,
        PluginValueRow, SessionRecord, StatsService,
    },
    AppState, PlayerIdentity,
};

use super::mocks::{FailingStatsRepository, MockAuditConnector};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app: Router,
    pub identities: Arc<InMemoryIdentityRepository>,
    pub stats: Arc<InMemoryStatsRepository>,
    pub audit: Option<Arc<MockAuditConnector>>,
}

impl TestSetup {
    /// Sends `GET /api/stats/{identifier}` and returns status and JSON body
    pub async fn get_stats(&self, identifier: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("GET")
            .uri(format!("/api/stats/{}", identifier))
            .body(Body::empty())
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body).to_string())
    }
}

pub struct TestSetupBuilder {
    players: Vec<PlayerIdentity>,
    stats: Arc<InMemoryStatsRepository>,
    audit: Option<Arc<MockAuditConnector>>,
    failing_stats: bool,
    resolver_timeout: Duration,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            stats: Arc::new(InMemoryStatsRepository::new()),
            audit: None,
            failing_stats: false,
            resolver_timeout: Duration::from_millis(500),
        }
    }

    /// Registers a player with a random uuid
    pub fn with_player(self, name: &str, registered_at: DateTime<Utc>) -> Self {
        let uuid = Uuid::new_v4().to_string();
        self.with_player_uuid(&uuid, name, registered_at)
    }

    pub fn with_player_uuid(
        mut self,
        uuid: &str,
        name: &str,
        registered_at: DateTime<Utc>,
    ) -> Self {
        let internal_id = self.players.len() as i64 + 1;
        self.players
            .push(PlayerIdentity::new(uuid, name, internal_id, registered_at));
        self
    }

    /// Adds a closed session of `minutes` for the player with `internal_id`
    pub fn with_session(
        self,
        internal_id: i64,
        minutes: i64,
        mob_kills: i64,
        deaths: i64,
    ) -> Self {
        let ended_at = Utc::now() - ChronoDuration::minutes(1);
        self.stats.add_session(SessionRecord {
            internal_id,
            started_at: ended_at - ChronoDuration::minutes(minutes),
            ended_at: Some(ended_at),
            mob_kills,
            deaths,
        });
        self
    }

    pub fn with_kills(self, killer_uuid: &str, count: usize) -> Self {
        for i in 0..count {
            self.stats.add_kill(KillRecord {
                killer_uuid: killer_uuid.to_string(),
                victim_uuid: format!("victim-{}", i),
                happened_at: Utc::now(),
            });
        }
        self
    }

    pub fn with_groups(self, uuid: &str, primary: &str, grants: &[&str]) -> Self {
        self.stats.set_primary_group(uuid, primary);
        for grant in grants {
            self.stats
                .grant_permission(uuid, &format!("group.{}", grant), true);
        }
        self
    }

    pub fn with_balance(
        self,
        uuid: &str,
        plugin: &str,
        numeric: Option<f64>,
        text: Option<&str>,
    ) -> Self {
        self.stats.add_plugin_value(PluginValueRow {
            plugin: plugin.to_string(),
            metric: "Balance".to_string(),
            player_uuid: uuid.to_string(),
            numeric_value: numeric,
            text_value: text.map(str::to_string),
            written_at: Utc::now(),
        });
        self
    }

    pub fn with_audit(mut self, audit: MockAuditConnector) -> Self {
        self.audit = Some(Arc::new(audit));
        self
    }

    pub fn with_failing_stats(mut self) -> Self {
        self.failing_stats = true;
        self
    }

    pub fn build(self) -> TestSetup {
        let identities = Arc::new(InMemoryIdentityRepository::with_players(self.players));
        let identity_repository: Arc<dyn IdentityRepository + Send + Sync> = identities.clone();

        let mut builder = if self.failing_stats {
            StatsService::builder(identity_repository, Arc::new(FailingStatsRepository))
        } else {
            StatsService::builder(identity_repository, self.stats.clone())
        };
        builder = builder.with_resolver_timeout(self.resolver_timeout);

        if let Some(audit) = &self.audit {
            let connector: Arc<dyn AuditConnector> = audit.clone();
            builder = builder.with_audit_connector(connector);
        }

        let app = router(AppState::new(Arc::new(builder.build())));

        TestSetup {
            app,
            identities,
            stats: self.stats,
            audit: self.audit,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
