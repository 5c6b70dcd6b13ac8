use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection, Row};
use tracing::{debug, instrument, warn};

use super::{models::BlockAuditCount, StatsError};

/// CoreProtect action codes
const ACTION_BREAK: i32 = 0;
const ACTION_PLACE: i32 = 1;

/// Connection parameters of the block-audit MySQL store
#[derive(Debug, Clone)]
pub struct AuditStoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub table_prefix: String,
}

impl AuditStoreConfig {
    pub fn validate(&self) -> Result<(), StatsError> {
        let prefix_ok = self
            .table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !prefix_ok {
            return Err(StatsError::Validation(format!(
                "audit table prefix '{}' may only contain letters, digits and '_'",
                self.table_prefix
            )));
        }
        Ok(())
    }
}

/// Opens dedicated connections to the block-audit store
#[async_trait]
pub trait AuditConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn AuditConnection>, StatsError>;
}

/// One open connection. Callers must `close` it on every path they
/// complete; a connection abandoned by a cancelled request is released on drop.
#[async_trait]
pub trait AuditConnection: Send {
    /// Store-local numeric reference for a player name
    async fn user_ref(&mut self, name: &str) -> Result<Option<i64>, StatsError>;

    async fn action_counts(&mut self, user_ref: i64) -> Result<BlockAuditCount, StatsError>;

    async fn close(self: Box<Self>) -> Result<(), StatsError>;
}

pub struct MySqlAuditConnector {
    options: MySqlConnectOptions,
    table_prefix: String,
}

impl MySqlAuditConnector {
    pub fn new(config: &AuditStoreConfig) -> Result<Self, StatsError> {
        config.validate()?;

        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database);
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        Ok(Self {
            options: options.disable_statement_logging(),
            table_prefix: config.table_prefix.clone(),
        })
    }
}

#[async_trait]
impl AuditConnector for MySqlAuditConnector {
    #[instrument(skip(self))]
    async fn connect(&self) -> Result<Box<dyn AuditConnection>, StatsError> {
        debug!("Opening block audit connection");

        let conn = MySqlConnection::connect_with(&self.options)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to open block audit connection");
                StatsError::Audit(e.to_string())
            })?;

        Ok(Box::new(MySqlAuditConnection {
            conn,
            table_prefix: self.table_prefix.clone(),
        }))
    }
}

struct MySqlAuditConnection {
    conn: MySqlConnection,
    table_prefix: String,
}

#[async_trait]
impl AuditConnection for MySqlAuditConnection {
    async fn user_ref(&mut self, name: &str) -> Result<Option<i64>, StatsError> {
        let sql = format!(
            "SELECT CAST(rowid AS SIGNED) AS rowid FROM {}user WHERE user = ? LIMIT 1",
            self.table_prefix
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(|e| StatsError::Audit(e.to_string()))?;

        row.map(|r| r.try_get::<i64, _>("rowid"))
            .transpose()
            .map_err(|e| StatsError::Audit(e.to_string()))
    }

    async fn action_counts(&mut self, user_ref: i64) -> Result<BlockAuditCount, StatsError> {
        let sql = format!(
            r#"
            SELECT
                CAST(COALESCE(SUM(action = ?), 0) AS SIGNED) AS mined,
                CAST(COALESCE(SUM(action = ?), 0) AS SIGNED) AS placed
            FROM {}block
            WHERE user = ? AND action IN (?, ?)
            "#,
            self.table_prefix
        );
        let row = sqlx::query(&sql)
            .bind(ACTION_BREAK)
            .bind(ACTION_PLACE)
            .bind(user_ref)
            .bind(ACTION_BREAK)
            .bind(ACTION_PLACE)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| StatsError::Audit(e.to_string()))?;

        let decode = |e: sqlx::Error| StatsError::Audit(e.to_string());
        Ok(BlockAuditCount {
            mined: row.try_get("mined").map_err(decode)?,
            placed: row.try_get("placed").map_err(decode)?,
        })
    }

    async fn close(self: Box<Self>) -> Result<(), StatsError> {
        self.conn
            .close()
            .await
            .map_err(|e| StatsError::Audit(e.to_string()))
    }
}
