use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{models::PluginValueRow, StatsError};

/// How a matched plugin-value row is turned into an amount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceParser {
    Numeric,
    Text,
    /// Numeric value, falling back to the text value when the numeric one is
    /// missing or exactly zero. A genuinely empty balance therefore also
    /// triggers the text parse.
    #[default]
    NumericOrText,
}

/// A known (plugin, metric) pair that carries a player balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomySource {
    pub plugin: String,
    pub metric: String,
    #[serde(default)]
    pub parser: BalanceParser,
}

impl EconomySource {
    pub fn new(plugin: &str, metric: &str, parser: BalanceParser) -> Self {
        Self {
            plugin: plugin.to_string(),
            metric: metric.to_string(),
            parser,
        }
    }

    pub fn matches(&self, row: &PluginValueRow) -> bool {
        self.plugin.eq_ignore_ascii_case(row.plugin.trim())
            && self.metric.eq_ignore_ascii_case(row.metric.trim())
    }

    /// Amount carried by the row, in fractional currency units
    pub fn extract(&self, row: &PluginValueRow) -> Option<f64> {
        let text = || row.text_value.as_deref().and_then(parse_text_amount);
        match self.parser {
            BalanceParser::Numeric => row.numeric_value,
            BalanceParser::Text => text(),
            BalanceParser::NumericOrText => match row.numeric_value {
                Some(value) if value != 0.0 => Some(value),
                numeric => text().or(numeric),
            },
        }
    }
}

/// Validated set of economy sources, replacing wildcard name matching
#[derive(Debug, Clone)]
pub struct EconomyMapping {
    sources: Vec<EconomySource>,
}

impl EconomyMapping {
    pub fn new(sources: Vec<EconomySource>) -> Result<Self, StatsError> {
        if sources.is_empty() {
            return Err(StatsError::Validation(
                "economy mapping needs at least one source".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &sources {
            if source.plugin.trim().is_empty() || source.metric.trim().is_empty() {
                return Err(StatsError::Validation(
                    "economy source with blank plugin or metric name".to_string(),
                ));
            }
            let pair = (
                source.plugin.trim().to_lowercase(),
                source.metric.trim().to_lowercase(),
            );
            if !seen.insert(pair) {
                return Err(StatsError::Validation(format!(
                    "economy source {}/{} is listed twice",
                    source.plugin, source.metric
                )));
            }
        }

        Ok(Self { sources })
    }

    /// Plugin names worth asking the store about
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .sources
            .iter()
            .map(|s| s.plugin.trim().to_lowercase())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn source_for(&self, row: &PluginValueRow) -> Option<&EconomySource> {
        self.sources.iter().find(|s| s.matches(row))
    }

    /// Most recently written row that matches a source, with its amount
    pub fn select_balance(&self, rows: &[PluginValueRow]) -> Option<f64> {
        rows.iter()
            .filter_map(|row| self.source_for(row).map(|source| (row, source)))
            .max_by_key(|(row, _)| row.written_at)
            .and_then(|(row, source)| source.extract(row))
    }
}

impl Default for EconomyMapping {
    fn default() -> Self {
        let sources = ["Economy", "Vault", "EssentialsX", "CMI"]
            .iter()
            .map(|plugin| EconomySource::new(plugin, "Balance", BalanceParser::NumericOrText))
            .collect();
        Self::new(sources).expect("built-in economy mapping is valid")
    }
}

/// Parses a display-formatted amount such as `"$1,500.25"` or `"1.500,00"`.
///
/// Everything except digits and the separators `.` `,` is dropped. When both
/// separators appear the last one is the decimal mark. A lone separator
/// followed by exactly three digits, or a separator that repeats, groups
/// thousands; otherwise it is the decimal mark.
pub fn parse_text_amount(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let decimal_at = match (kept.rfind('.'), kept.rfind(',')) {
        (Some(dot), Some(comma)) => Some(dot.max(comma)),
        (Some(dot), None) => lone_separator_decimal(&kept, '.', dot),
        (None, Some(comma)) => lone_separator_decimal(&kept, ',', comma),
        (None, None) => None,
    };

    let normalized: String = kept
        .char_indices()
        .filter_map(|(i, c)| {
            if c.is_ascii_digit() {
                Some(c)
            } else if Some(i) == decimal_at {
                Some('.')
            } else {
                None
            }
        })
        .collect();

    normalized.parse::<f64>().ok()
}

fn lone_separator_decimal(kept: &str, separator: char, at: usize) -> Option<usize> {
    if kept.matches(separator).count() > 1 {
        return None;
    }
    let digits_after = kept.len() - at - 1;
    if digits_after == 3 {
        None
    } else {
        Some(at)
    }
}
