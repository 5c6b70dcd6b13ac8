use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::shared::AppError;
use crate::stats::{
    audit::AuditStoreConfig,
    economy_mapping::{EconomyMapping, EconomySource},
    format::DEFAULT_DATE_FORMAT,
    rank_table::{RankEntry, RankTable},
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_AUDIT_PORT: u16 = 3306;
const DEFAULT_AUDIT_PREFIX: &str = "co_";
const DEFAULT_RESOLVER_TIMEOUT_MS: u64 = 3000;

/// Process configuration, read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub audit_store: Option<AuditStoreConfig>,
    pub resolver_timeout: Duration,
    pub stats_config_path: Option<String>,
    pub member_since_format: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Builds the configuration from an explicit variable map. Blank values
    /// count as unset.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, AppError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let resolver_timeout_ms = match get("RESOLVER_TIMEOUT_MS") {
            Some(raw) => parse_number::<u64>("RESOLVER_TIMEOUT_MS", &raw)?,
            None => DEFAULT_RESOLVER_TIMEOUT_MS,
        };
        if resolver_timeout_ms == 0 {
            return Err(AppError::Config(
                "RESOLVER_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        let member_since_format =
            get("MEMBER_SINCE_FORMAT").unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
        validate_date_format(&member_since_format)?;

        let audit_store = match (
            get("AUDIT_DB_HOST"),
            get("AUDIT_DB_USER"),
            get("AUDIT_DB_NAME"),
        ) {
            (Some(host), Some(user), Some(database)) => {
                let port = match get("AUDIT_DB_PORT") {
                    Some(raw) => parse_number::<u16>("AUDIT_DB_PORT", &raw)?,
                    None => DEFAULT_AUDIT_PORT,
                };
                let store = AuditStoreConfig {
                    host,
                    port,
                    user,
                    password: get("AUDIT_DB_PASSWORD"),
                    database,
                    table_prefix: get("AUDIT_DB_TABLE_PREFIX")
                        .unwrap_or_else(|| DEFAULT_AUDIT_PREFIX.to_string()),
                };
                store
                    .validate()
                    .map_err(|e| AppError::Config(e.to_string()))?;
                Some(store)
            }
            _ => None,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: get("DATABASE_URL"),
            audit_store,
            resolver_timeout: Duration::from_millis(resolver_timeout_ms),
            stats_config_path: get("STATS_CONFIG_PATH"),
            member_since_format,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::Config(format!("{} is not a valid number: '{}'", key, raw)))
}

fn validate_date_format(format: &str) -> Result<(), AppError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(AppError::Config(format!(
            "MEMBER_SINCE_FORMAT '{}' is not a valid date format",
            format
        )));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct StatsConfigFile {
    ranks: Option<Vec<RankEntry>>,
    economy: Option<Vec<EconomySource>>,
}

/// Rank table and economy mapping, validated
#[derive(Debug, Clone, Default)]
pub struct StatsConfig {
    pub rank_table: RankTable,
    pub economy_mapping: EconomyMapping,
}

impl StatsConfig {
    /// Parses a TOML document. Sections left out keep their defaults.
    pub fn from_toml(raw: &str) -> Result<Self, AppError> {
        let file: StatsConfigFile =
            toml::from_str(raw).map_err(|e| AppError::Config(e.to_string()))?;

        let rank_table = match file.ranks {
            Some(ranks) => RankTable::new(ranks).map_err(|e| AppError::Config(e.to_string()))?,
            None => RankTable::default(),
        };
        let economy_mapping = match file.economy {
            Some(sources) => {
                EconomyMapping::new(sources).map_err(|e| AppError::Config(e.to_string()))?
            }
            None => EconomyMapping::default(),
        };

        Ok(Self {
            rank_table,
            economy_mapping,
        })
    }

    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let Some(path) = path else {
            debug!("No stats config file, using built-in rank table and economy mapping");
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(Path::new(path))
            .map_err(|e| AppError::Config(format!("Failed to read {}: {}", path, e)))?;
        let config = Self::from_toml(&raw)?;
        info!(path = %path, "Loaded stats config");
        Ok(config)
    }
}
