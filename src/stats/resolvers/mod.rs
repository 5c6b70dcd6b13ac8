pub mod block_audit;
pub mod combat;
pub mod economy;
pub mod rank;
pub mod session;

pub use block_audit::BlockAuditResolver;
pub use combat::CombatAggregator;
pub use economy::EconomyResolver;
pub use rank::RankResolver;
pub use session::SessionAggregator;
