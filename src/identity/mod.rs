// Public API - what other modules can use
pub use errors::IdentityError;
pub use identifier::Identifier;
pub use models::PlayerIdentity;
pub use service::IdentityResolver;

// Internal modules
mod errors;
pub mod identifier;
pub mod models;
pub mod repository;
mod service;
