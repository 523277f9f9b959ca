//! Shared types for the FAIRLINE engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that matching, strategy,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a market is quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketType {
    /// Player prop where most books only price the "over"/"yes" side.
    #[serde(rename = "player-one-way")]
    PlayerOneWay,
    #[serde(rename = "totals")]
    Totals,
    #[serde(rename = "spread")]
    Spread,
}

impl MarketType {
    /// Whether both sides are expected to be priced (de-vig directly).
    pub fn is_two_sided(&self) -> bool {
        !matches!(self, MarketType::PlayerOneWay)
    }

    /// Category used when the market catalog doesn't say otherwise.
    pub fn default_category(&self) -> MarketCategory {
        match self {
            MarketType::PlayerOneWay => MarketCategory::Player,
            MarketType::Totals | MarketType::Spread => MarketCategory::Match,
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketType::PlayerOneWay => write!(f, "player-one-way"),
            MarketType::Totals => write!(f, "totals"),
            MarketType::Spread => write!(f, "spread"),
        }
    }
}

/// Attempt to parse a string into a MarketType (case-insensitive).
impl std::str::FromStr for MarketType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "player-one-way" | "player_one_way" | "one-way" | "oneway" | "player" => {
                Ok(MarketType::PlayerOneWay)
            }
            "totals" | "total" | "over/under" | "ou" => Ok(MarketType::Totals),
            "spread" | "spreads" | "handicap" | "ah" => Ok(MarketType::Spread),
            _ => Err(anyhow::anyhow!("Unknown market type: {s}")),
        }
    }
}

/// Whether a market is about a single player or the whole match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCategory {
    Player,
    Match,
}

impl fmt::Display for MarketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketCategory::Player => write!(f, "player"),
            MarketCategory::Match => write!(f, "match"),
        }
    }
}

/// Side of a two-sided price pair.
///
/// `Primary` is over/home, `Secondary` is under/away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Primary,
    Secondary,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Primary, Side::Secondary];

    /// Bet-type label as shown to a bettor for this kind of market.
    pub fn label(&self, market_type: MarketType) -> &'static str {
        match (market_type, self) {
            (MarketType::Spread, Side::Primary) => "Home",
            (MarketType::Spread, Side::Secondary) => "Away",
            (_, Side::Primary) => "Over",
            (_, Side::Secondary) => "Under",
        }
    }
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// A quote exactly as handed over by the odds collaborator.
///
/// Numeric fields are kept as loose JSON values: feeds send numbers,
/// numeric strings, nulls, or garbage, and intake decides what survives.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawQuote {
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: String,
    #[serde(default, alias = "market", deserialize_with = "lenient_string")]
    pub market_key: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub market_type: String,
    #[serde(default, alias = "point")]
    pub line: serde_json::Value,
    #[serde(default, alias = "home_price", alias = "over")]
    pub over_price: serde_json::Value,
    #[serde(default, alias = "away_price", alias = "under")]
    pub under_price: serde_json::Value,
    #[serde(default, alias = "book", deserialize_with = "lenient_string")]
    pub bookmaker: String,
    /// RFC 3339 text or epoch seconds, as sent.
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub timestamp: Option<String>,
}

/// Strings pass through, numbers are rendered, anything else is empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// One bookmaker's price for one market on one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub subject: String,
    /// Canonical market key (after catalog lookup), e.g. "player_shots".
    pub market_key: String,
    pub market_type: MarketType,
    pub raw_line: f64,
    /// Line after half-point normalization.
    pub line: f64,
    /// Over/home decimal odds (> 1.0).
    pub over_price: f64,
    /// Under/away decimal odds (> 1.0), absent for one-way quotes.
    pub under_price: Option<f64>,
    pub bookmaker: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Quote {
    /// Decimal odds offered on a side, if priced.
    pub fn price(&self, side: Side) -> Option<f64> {
        match side {
            Side::Primary => Some(self.over_price),
            Side::Secondary => self.under_price,
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} @ {:.2}",
            self.bookmaker, self.subject, self.market_key, self.line, self.over_price,
        )?;
        if let Some(under) = self.under_price {
            write!(f, " / {under:.2}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// One logical market line: the same bet quoted by several bookmakers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCluster {
    pub subject: String,
    pub market_key: String,
    pub market_type: MarketType,
    pub category: MarketCategory,
    /// Representative line (member average, rounded to the nearest half).
    pub line: f64,
    /// At most one quote per bookmaker, in clustering order.
    pub members: Vec<Quote>,
}

impl MarketCluster {
    /// Number of distinct contributing bookmakers.
    pub fn book_count(&self) -> usize {
        let mut books: Vec<&str> = self.members.iter().map(|q| q.bookmaker.as_str()).collect();
        books.sort_unstable();
        books.dedup();
        books.len()
    }

    pub fn contains_bookmaker(&self, bookmaker: &str) -> bool {
        self.members.iter().any(|q| q.bookmaker == bookmaker)
    }

    /// Mean normalized line of the members (0.0 when empty).
    pub fn average_line(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().map(|q| q.line).sum::<f64>() / self.members.len() as f64
    }
}

impl fmt::Display for MarketCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({} books)",
            self.subject,
            self.market_key,
            self.line,
            self.book_count(),
        )
    }
}

// ---------------------------------------------------------------------------
// Fair value & opportunities
// ---------------------------------------------------------------------------

/// A reference book's contribution to a fair value, kept for audit/display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceQuote {
    pub bookmaker: String,
    pub over_price: f64,
    pub under_price: Option<f64>,
    pub vig_percent: f64,
    /// De-vigged probability this book implies for the side being scored.
    pub fair_probability: f64,
}

/// Fair value of one side of one cluster. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValue {
    pub fair_probability: f64,
    pub fair_odds: f64,
    pub vig_percent: f64,
    /// Set when a single book determined the value (sharp or lowest vig).
    pub reference_bookmaker: Option<String>,
    pub references: Vec<ReferenceQuote>,
}

impl FairValue {
    pub fn books_used(&self) -> usize {
        self.references.len()
    }
}

/// A ranked, bettable price with positive edge over the fair value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvOpportunity {
    pub subject: String,
    pub market_key: String,
    pub market_name: String,
    pub category: MarketCategory,
    pub line: f64,
    pub side: Side,
    /// "Over" / "Under" / "Home" / "Away".
    pub bet_type: String,
    pub bookmaker: String,
    pub offered_odds: f64,
    pub fair_odds: f64,
    pub fair_probability: f64,
    pub ev_percent: f64,
    pub books_used: usize,
    pub references: Vec<ReferenceQuote>,
}

impl fmt::Display for EvOpportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} {} @ {:.2} (fair {:.2}, EV {:+.2}%, {} books)",
            self.bookmaker,
            self.subject,
            self.market_name,
            self.bet_type,
            self.line,
            self.offered_odds,
            self.fair_odds,
            self.ev_percent,
            self.books_used,
        )
    }
}

// ---------------------------------------------------------------------------
// Run results
// ---------------------------------------------------------------------------

/// Counters for one pipeline run, from intake through ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub quotes_in: usize,
    pub quotes_rejected: usize,
    pub groups: usize,
    pub clusters: usize,
    pub outliers_removed: usize,
    /// Sides with no usable fair value (too few reference books).
    pub sides_skipped: usize,
    pub below_threshold: usize,
    pub implausible: usize,
    pub opportunities: usize,
}

/// One scan of one snapshot, as persisted for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub run_id: uuid::Uuid,
    pub generated_at: DateTime<Utc>,
    /// Name of the quote source that produced the snapshot.
    pub source: String,
    pub devig_method: String,
    pub stats: RunStats,
    pub opportunities: Vec<EvOpportunity>,
}

impl ScanReport {
    /// The best `n` opportunities (the list is already ranked).
    pub fn top(&self, n: usize) -> &[EvOpportunity] {
        &self.opportunities[..n.min(self.opportunities.len())]
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Reportable engine conditions. Bad quote data is never an error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Unknown de-vig method: {0} (expected multiplicative, power, additive or worstCase)")]
    UnknownDevigMethod(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Snapshot error ({source_name}): {message}")]
    Snapshot { source_name: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
