use thiserror::Error;

use crate::shared::AppError;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Player not found: {0}")]
    NotFound(String),

    #[error("Identity store error: {0}")]
    Repository(String),

    #[error("Identity lookup timed out after {0} ms")]
    Timeout(u64),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotFound(identifier) => {
                AppError::NotFound(format!("Player not found: {}", identifier))
            }
            IdentityError::Repository(msg) => AppError::DatabaseError(msg),
            IdentityError::Timeout(ms) => AppError::Timeout(format!(
                "Identity lookup timed out after {} ms",
                ms
            )),
        }
    }
}
