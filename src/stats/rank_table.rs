use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use super::StatsError;

/// The fixed set of ranks the site knows how to display
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalRank {
    Default,
    Donador,
    Fundador,
    Developer,
    Killuwu,
    Neroferno,
}

impl CanonicalRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalRank::Default => "default",
            CanonicalRank::Donador => "donador",
            CanonicalRank::Fundador => "fundador",
            CanonicalRank::Developer => "developer",
            CanonicalRank::Killuwu => "killuwu",
            CanonicalRank::Neroferno => "neroferno",
        }
    }
}

impl fmt::Display for CanonicalRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the rank table as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub key: CanonicalRank,
    /// Raw group names that mean this rank. The key's own name always matches.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Higher wins when a player carries several ranks
    pub priority: u32,
    pub label: String,
    pub badge: String,
}

impl RankEntry {
    fn new(key: CanonicalRank, aliases: &[&str], priority: u32, label: &str) -> Self {
        Self {
            key,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            priority,
            label: label.to_string(),
            badge: format!("/ranks/{}.png", key),
        }
    }
}

/// Validated rank table: alias lookup plus display data per canonical rank.
///
/// Only constructible through [`RankTable::new`], so every canonical rank has
/// exactly one entry, priorities are unique and no alias is claimed by two
/// ranks.
#[derive(Debug, Clone)]
pub struct RankTable {
    entries: HashMap<CanonicalRank, RankEntry>,
    aliases: HashMap<String, CanonicalRank>,
}

impl RankTable {
    pub fn new(entries: Vec<RankEntry>) -> Result<Self, StatsError> {
        let mut by_key: HashMap<CanonicalRank, RankEntry> = HashMap::new();
        let mut priorities: HashMap<u32, CanonicalRank> = HashMap::new();
        let mut aliases: HashMap<String, CanonicalRank> = HashMap::new();

        for entry in entries {
            if by_key.contains_key(&entry.key) {
                return Err(StatsError::Validation(format!(
                    "rank '{}' is configured more than once",
                    entry.key
                )));
            }
            if let Some(other) = priorities.insert(entry.priority, entry.key) {
                return Err(StatsError::Validation(format!(
                    "ranks '{}' and '{}' share priority {}",
                    other, entry.key, entry.priority
                )));
            }

            let names = std::iter::once(entry.key.as_str().to_string())
                .chain(entry.aliases.iter().cloned());
            for name in names {
                let normalized = normalize_token(&name);
                if normalized.is_empty() {
                    return Err(StatsError::Validation(format!(
                        "rank '{}' has a blank alias",
                        entry.key
                    )));
                }
                if let Some(owner) = aliases.get(&normalized).copied() {
                    if owner != entry.key {
                        return Err(StatsError::Validation(format!(
                            "alias '{}' is claimed by both '{}' and '{}'",
                            normalized, owner, entry.key
                        )));
                    }
                }
                aliases.insert(normalized, entry.key);
            }

            by_key.insert(entry.key, entry);
        }

        if let Some(missing) = CanonicalRank::iter().find(|key| !by_key.contains_key(key)) {
            return Err(StatsError::Validation(format!(
                "rank '{}' has no table entry",
                missing
            )));
        }

        Ok(Self {
            entries: by_key,
            aliases,
        })
    }

    /// Canonical rank for a raw group token, if any alias matches
    pub fn lookup(&self, raw: &str) -> Option<CanonicalRank> {
        self.aliases.get(&normalize_token(raw)).copied()
    }

    pub fn entry(&self, key: CanonicalRank) -> Option<&RankEntry> {
        self.entries.get(&key)
    }

    pub fn priority(&self, key: CanonicalRank) -> u32 {
        self.entries.get(&key).map(|e| e.priority).unwrap_or_default()
    }
}

impl Default for RankTable {
    fn default() -> Self {
        let entries = vec![
            RankEntry::new(CanonicalRank::Default, &["miembro", "member"], 0, "Default"),
            RankEntry::new(CanonicalRank::Donador, &["donator", "vip"], 10, "Donador"),
            RankEntry::new(CanonicalRank::Fundador, &["founder"], 20, "Fundador"),
            RankEntry::new(CanonicalRank::Developer, &["dev"], 30, "Developer"),
            RankEntry::new(CanonicalRank::Killuwu, &[], 40, "KillUwU"),
            RankEntry::new(CanonicalRank::Neroferno, &[], 50, "Neroferno"),
        ];
        Self::new(entries).expect("built-in rank table is valid")
    }
}

/// Reduces a raw group token to its lookup form.
///
/// Permission plugins decorate group names: zero-width characters, colour
/// codes (`§6`, `&c`), a `group.` node prefix and numeric weight prefixes
/// (`10_donador`) all get stripped before matching.
pub fn normalize_token(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if is_invisible(c) {
            continue;
        }
        if c == '§' || c == '&' {
            if let Some(next) = chars.peek() {
                if is_format_code(*next) {
                    chars.next();
                    continue;
                }
            }
        }
        cleaned.push(c);
    }

    let lowered = cleaned.trim().to_lowercase();
    let without_node = lowered.strip_prefix("group.").unwrap_or(&lowered);
    strip_weight_prefix(without_node).to_string()
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}')
}

fn is_format_code(c: char) -> bool {
    c.is_ascii_hexdigit() || matches!(c.to_ascii_lowercase(), 'k'..='o' | 'r' | 'x')
}

fn strip_weight_prefix(token: &str) -> &str {
    let digits = token.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return token;
    }
    match token[digits..].strip_prefix(['_', '-']) {
        Some(rest) if !rest.is_empty() => rest,
        _ => token,
    }
}
