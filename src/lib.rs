// Library crate for the player statistics service
// This file exposes the public API for integration tests

pub mod app;
pub mod config;
pub mod identity;
pub mod shared;
pub mod stats;

// Re-export commonly used types for easier access in tests
pub use app::router;
pub use config::{AppConfig, StatsConfig};
pub use identity::{IdentityError, IdentityResolver, PlayerIdentity};
pub use shared::{AppError, AppState};
pub use stats::{StatResolver, StatsError, StatsResponse, StatsService};
