use chrono::{DateTime, Utc};

use super::models::{
    BlockAuditCount, CombatCount, EconomyBalance, RankAssignment, ResolvedStat, SessionAggregate,
    StatsResponse,
};
use crate::identity::PlayerIdentity;

pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

const CURRENCY_TIERS: [(f64, &str); 3] = [(1e9, "B"), (1e6, "M"), (1e3, "k")];

/// Resolver outputs gathered for one request, pre-filled with defaults
#[derive(Debug, Clone)]
pub struct SnapshotParts {
    pub sessions: SessionAggregate,
    pub combat: CombatCount,
    pub economy: EconomyBalance,
    pub rank: RankAssignment,
    pub blocks: BlockAuditCount,
}

impl SnapshotParts {
    pub fn new(default_rank: RankAssignment) -> Self {
        Self {
            sessions: SessionAggregate::default(),
            combat: CombatCount::default(),
            economy: EconomyBalance::default(),
            rank: default_rank,
            blocks: BlockAuditCount::default(),
        }
    }

    pub fn apply(&mut self, stat: ResolvedStat) {
        match stat {
            ResolvedStat::Sessions(sessions) => self.sessions = sessions,
            ResolvedStat::Combat(combat) => self.combat = combat,
            ResolvedStat::Economy(economy) => self.economy = economy,
            ResolvedStat::Rank(rank) => self.rank = rank,
            ResolvedStat::Blocks(blocks) => self.blocks = blocks,
        }
    }

    /// Flattens identity and statistics into the response body
    pub fn assemble(self, identity: &PlayerIdentity, date_format: &str) -> StatsResponse {
        StatsResponse {
            username: identity.display_name.clone(),
            rank: self.rank.label,
            rank_image: self.rank.badge,
            playtime: format_playtime(self.sessions.total_playtime_ms),
            kills: self.combat.pvp_kills,
            mob_kills: self.sessions.mob_kills,
            deaths: self.sessions.deaths,
            money: format_currency(self.economy.amount),
            blocks_mined: self.blocks.mined,
            blocks_placed: self.blocks.placed,
            member_since: format_member_since(identity.registered_at, date_format),
        }
    }
}

/// `"{h}h {m}m"`, dropping the hour part when it is zero
pub fn format_playtime(total_ms: i64) -> String {
    let total_minutes = total_ms.max(0) / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours == 0 {
        format!("{}m", minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

/// Compact currency string: `2.5M`, `1k`, `3.25B`, or the plain amount
/// below one thousand
pub fn format_currency(amount: i64) -> String {
    let magnitude = amount.unsigned_abs() as f64;
    let Some(mut tier) = CURRENCY_TIERS.iter().position(|(t, _)| magnitude >= *t) else {
        return amount.to_string();
    };

    // 999_999 rounds to 1000.00k; show it as 1M instead
    if tier > 0 && round_cents(magnitude / CURRENCY_TIERS[tier].0) >= 1000.0 {
        tier -= 1;
    }

    let (divisor, suffix) = CURRENCY_TIERS[tier];
    let scaled = format!("{:.2}", amount as f64 / divisor);
    let trimmed = scaled.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, suffix)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_member_since(registered_at: DateTime<Utc>, date_format: &str) -> String {
    registered_at.format(date_format).to_string()
}
