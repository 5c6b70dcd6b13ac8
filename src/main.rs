use playerstats::{
    config::{AppConfig, StatsConfig},
    identity::repository::{
        IdentityRepository, InMemoryIdentityRepository, PostgresIdentityRepository,
    },
    router,
    shared::{AppError, AppState},
    stats::{
        audit::{AuditConnector, MySqlAuditConnector},
        InMemoryStatsRepository, PostgresStatsRepository, StatsService, StatsServiceBuilder,
    },
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playerstats=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "Player stats server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    info!("Starting player stats server");

    let config = AppConfig::from_env()?;
    let stats_config = StatsConfig::load(config.stats_config_path.as_deref())?;

    let builder = stats_service_builder(&config)
        .await?
        .with_rank_table(stats_config.rank_table)
        .with_economy_mapping(stats_config.economy_mapping)
        .with_resolver_timeout(config.resolver_timeout)
        .with_date_format(config.member_since_format.clone());

    let builder = match &config.audit_store {
        Some(audit_store) => {
            info!(
                host = %audit_store.host,
                database = %audit_store.database,
                "Block audit store enabled"
            );
            let connector: Arc<dyn AuditConnector> = Arc::new(
                MySqlAuditConnector::new(audit_store)
                    .map_err(|e| AppError::Config(e.to_string()))?,
            );
            builder.with_audit_connector(connector)
        }
        None => {
            info!("Block audit store not configured, block counts will be zero");
            builder
        }
    };

    let stats_service = builder.build();
    info!(resolvers = ?stats_service.resolver_names(), "Stats service ready");

    let app = router(AppState::new(Arc::new(stats_service)));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", config.bind_addr, e)))?;
    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await.map_err(|e| {
        error!(error = %e, "Server error");
        AppError::Internal
    })
}

async fn stats_service_builder(config: &AppConfig) -> Result<StatsServiceBuilder, AppError> {
    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL not set, serving from an empty in-memory store");
        let identity_repository: Arc<dyn IdentityRepository + Send + Sync> =
            Arc::new(InMemoryIdentityRepository::new());
        return Ok(StatsService::builder(
            identity_repository,
            Arc::new(InMemoryStatsRepository::new()),
        ));
    };

    let pool = sqlx::PgPool::connect(database_url)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
    info!("Connected to primary store");

    let identity_repository: Arc<dyn IdentityRepository + Send + Sync> =
        Arc::new(PostgresIdentityRepository::new(pool.clone()));
    Ok(StatsService::builder(
        identity_repository,
        Arc::new(PostgresStatsRepository::new(pool)),
    ))
}
