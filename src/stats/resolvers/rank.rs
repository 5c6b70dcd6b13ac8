use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::identity::PlayerIdentity;

use super::super::{
    models::{RankAssignment, RankKey, ResolvedStat},
    rank_table::{normalize_token, CanonicalRank, RankTable},
    repository::PermissionRepository,
    StatResolver, StatsError,
};

/// Picks one display rank out of the primary group and the group grants
pub struct RankResolver {
    repository: Arc<dyn PermissionRepository>,
    table: Arc<RankTable>,
}

impl RankResolver {
    pub fn new(repository: Arc<dyn PermissionRepository>, table: Arc<RankTable>) -> Self {
        Self { repository, table }
    }
}

#[async_trait]
impl StatResolver for RankResolver {
    async fn resolve(&self, identity: &PlayerIdentity) -> Result<ResolvedStat, StatsError> {
        let signals = self.repository.permission_signals(&identity.uuid).await?;

        let tokens: Vec<String> = signals
            .primary_group
            .into_iter()
            .chain(signals.group_grants)
            .collect();
        debug!(uuid = %identity.uuid, ?tokens, "Resolving rank from raw groups");

        Ok(ResolvedStat::Rank(assign_rank(&self.table, &tokens)))
    }

    fn fallback(&self) -> ResolvedStat {
        ResolvedStat::Rank(canonical_assignment(&self.table, CanonicalRank::Default))
    }

    fn name(&self) -> &'static str {
        "rank"
    }
}

/// Highest-priority recognised rank among the raw tokens.
///
/// With no recognised token the first non-default raw token is shown as is;
/// with no tokens at all the player is `default`.
pub fn assign_rank(table: &RankTable, tokens: &[String]) -> RankAssignment {
    let best = tokens
        .iter()
        .filter_map(|token| table.lookup(token))
        .max_by_key(|key| table.priority(*key));

    if let Some(key) = best {
        return canonical_assignment(table, key);
    }

    let unrecognized = tokens
        .iter()
        .map(|token| token.trim())
        .find(|token| !token.is_empty() && normalize_token(token) != CanonicalRank::Default.as_str());

    match unrecognized {
        Some(raw) => RankAssignment {
            key: RankKey::Unrecognized(raw.to_string()),
            label: raw.to_string(),
            badge: canonical_assignment(table, CanonicalRank::Default).badge,
        },
        None => canonical_assignment(table, CanonicalRank::Default),
    }
}

fn canonical_assignment(table: &RankTable, key: CanonicalRank) -> RankAssignment {
    match table.entry(key) {
        Some(entry) => RankAssignment {
            key: RankKey::Canonical(key),
            label: entry.label.clone(),
            badge: entry.badge.clone(),
        },
        None => RankAssignment {
            key: RankKey::Canonical(key),
            label: key.to_string(),
            badge: format!("/ranks/{}.png", key),
        },
    }
}
