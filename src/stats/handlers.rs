use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use super::models::StatsResponse;
use crate::shared::{AppError, AppState};

/// HTTP handler for a player's statistics snapshot
///
/// GET /api/stats/:identifier
/// The identifier is a display name or a UUID with or without dashes
#[instrument(name = "get_player_stats", skip(state))]
pub async fn get_player_stats(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<StatsResponse>, AppError> {
    let snapshot = state.stats_service.player_snapshot(&identifier).await?;

    info!(username = %snapshot.username, "Served player stats");
    Ok(Json(snapshot))
}

pub async fn health() -> &'static str {
    "ok"
}
