use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Block audit store error: {0}")]
    Audit(String),

    #[error("Resolver {resolver} timed out after {timeout_ms} ms")]
    Timeout {
        resolver: &'static str,
        timeout_ms: u64,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}
