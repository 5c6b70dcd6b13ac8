use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rank_table::CanonicalRank;

/// Totals summed over every session row of one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionAggregate {
    pub total_playtime_ms: i64,
    pub mob_kills: i64,
    pub deaths: i64,
}

/// One row of the session store
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub internal_id: i64,
    pub started_at: DateTime<Utc>,
    /// `None` while the session is still running
    pub ended_at: Option<DateTime<Utc>>,
    pub mob_kills: i64,
    pub deaths: i64,
}

impl SessionRecord {
    /// Elapsed time of the session; an open session runs until `now`
    pub fn duration_ms(&self, now: DateTime<Utc>) -> i64 {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).num_milliseconds().max(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatCount {
    pub pvp_kills: i64,
}

/// A player-kill event from the combat store
#[derive(Debug, Clone)]
pub struct KillRecord {
    pub killer_uuid: String,
    pub victim_uuid: String,
    pub happened_at: DateTime<Utc>,
}

/// Balance in base currency units. Zero is also what a failed resolution
/// produces; the two cases are indistinguishable downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EconomyBalance {
    pub amount: i64,
}

/// A row of the generic plugin-value store
#[derive(Debug, Clone)]
pub struct PluginValueRow {
    pub plugin: String,
    pub metric: String,
    pub player_uuid: String,
    pub numeric_value: Option<f64>,
    pub text_value: Option<String>,
    pub written_at: DateTime<Utc>,
}

/// Permission signals for one player: the primary group plus every
/// `group.<name>` grant
#[derive(Debug, Clone, Default)]
pub struct PermissionSignals {
    pub primary_group: Option<String>,
    pub group_grants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankKey {
    Canonical(CanonicalRank),
    /// A raw group no alias recognises, shown verbatim
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankAssignment {
    pub key: RankKey,
    pub label: String,
    pub badge: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockAuditCount {
    pub mined: i64,
    pub placed: i64,
}

/// Output of one statistic resolver
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedStat {
    Sessions(SessionAggregate),
    Combat(CombatCount),
    Economy(EconomyBalance),
    Rank(RankAssignment),
    Blocks(BlockAuditCount),
}

/// The flat statistics snapshot returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub username: String,
    pub rank: String,
    pub rank_image: String,
    pub playtime: String,
    pub kills: i64,
    pub mob_kills: i64,
    pub deaths: i64,
    pub money: String,
    pub blocks_mined: i64,
    pub blocks_placed: i64,
    pub member_since: String,
}
