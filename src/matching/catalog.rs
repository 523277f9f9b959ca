//! Market catalog.
//!
//! Books label the same market differently ("player_shots", "Shots",
//! "total_shots"). The catalog maps every known label to one canonical
//! key and carries the display name, quoting style and category.

use serde::{Deserialize, Serialize};

use crate::types::{MarketCategory, MarketType};

/// One canonical market and the labels it is known by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDefinition {
    pub key: String,
    pub display_name: String,
    pub market_type: MarketType,
    /// Overrides the market type's default category.
    #[serde(default)]
    pub category: Option<MarketCategory>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl MarketDefinition {
    fn new(
        key: &str,
        display_name: &str,
        market_type: MarketType,
        aliases: &[&str],
    ) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            market_type,
            category: None,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn matches(&self, label: &str) -> bool {
        self.key.eq_ignore_ascii_case(label)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(label))
    }

    pub fn category(&self) -> MarketCategory {
        self.category
            .unwrap_or_else(|| self.market_type.default_category())
    }
}

/// Immutable lookup table of market definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketCatalog {
    definitions: Vec<MarketDefinition>,
}

impl Default for MarketCatalog {
    fn default() -> Self {
        use MarketType::*;
        Self::new(vec![
            MarketDefinition::new("totals", "Total Goals", Totals, &["total", "match_totals", "over_under"]),
            MarketDefinition::new("spreads", "Handicap", Spread, &["spread", "asian_handicap", "handicap"]),
            MarketDefinition::new("alternate_totals", "Alt Total Goals", Totals, &["alt_totals"]),
            MarketDefinition::new("team_totals", "Team Total", Totals, &[]),
            MarketDefinition::new("player_shots", "Shots", PlayerOneWay, &["shots", "total_shots", "player_total_shots"]),
            MarketDefinition::new("player_shots_on_target", "Shots on Target", PlayerOneWay, &["shots_on_target", "sot", "player_sot"]),
            MarketDefinition::new("player_goal_scorer_anytime", "Anytime Goalscorer", PlayerOneWay, &["anytime_goalscorer", "ags", "to_score"]),
            MarketDefinition::new("player_assists", "Assists", PlayerOneWay, &["assists"]),
            MarketDefinition::new("player_points", "Points", PlayerOneWay, &["points", "pts"]),
            MarketDefinition::new("player_rebounds", "Rebounds", PlayerOneWay, &["rebounds", "reb"]),
            MarketDefinition::new("player_threes", "Threes Made", PlayerOneWay, &["threes", "3pm"]),
        ])
    }
}

impl MarketCatalog {
    pub fn new(definitions: Vec<MarketDefinition>) -> Self {
        Self { definitions }
    }

    /// Build from config entries, falling back to the built-in catalog.
    pub fn from_config(definitions: &[MarketDefinition]) -> Self {
        if definitions.is_empty() {
            Self::default()
        } else {
            Self::new(definitions.to_vec())
        }
    }

    /// Definition a label resolves to (case-insensitive on key and aliases).
    pub fn resolve(&self, label: &str) -> Option<&MarketDefinition> {
        let label = label.trim();
        self.definitions.iter().find(|d| d.matches(label))
    }

    /// Canonical key for a label. Unknown labels pass through trimmed.
    pub fn canonical_key(&self, label: &str) -> String {
        self.resolve(label)
            .map(|d| d.key.clone())
            .unwrap_or_else(|| label.trim().to_string())
    }

    pub fn display_name(&self, key: &str) -> String {
        self.resolve(key)
            .map(|d| d.display_name.clone())
            .unwrap_or_else(|| key.to_string())
    }

    pub fn category_for(&self, key: &str, market_type: MarketType) -> MarketCategory {
        self.resolve(key)
            .map(MarketDefinition::category)
            .unwrap_or_else(|| market_type.default_category())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
