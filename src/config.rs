//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every engine knob has a default, so a config file only needs to name
//! what it changes. Numeric sanity is checked by `EngineConfig::validate`
//! before the engine is built.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::matching::catalog::MarketDefinition;
use crate::matching::cluster::ClusterConfig;
use crate::matching::outlier::OutlierBounds;
use crate::types::EngineError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// Market catalog entries. Empty means the built-in catalog.
    #[serde(default)]
    pub markets: Vec<MarketDefinition>,
}

/// Engine knobs. Passed into the pipeline at construction; never global.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// multiplicative | power | additive | worstCase
    pub devig_method: String,
    /// Clustering tolerance for totals and one-way markets.
    pub line_tolerance: f64,
    /// Clustering tolerance for spread/handicap markets.
    pub spread_tolerance: f64,
    pub min_bookmakers: usize,
    pub min_ev_percent: f64,
    /// EV above this is treated as a matching error, logged and dropped.
    pub max_plausible_ev: f64,
    pub outlier_high_ratio: f64,
    pub outlier_low_ratio: f64,
    /// Margin assumed on one-sided quotes when no book prices both sides.
    pub one_way_vig_allowance: f64,
    /// Two-sided books needed before a side gets a fair value.
    pub min_reference_books: usize,
    /// Sharp/reference books, highest priority first.
    pub sharp_books: Vec<String>,
    /// Books whose prices may be surfaced. Empty means every book.
    pub playable_books: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            devig_method: "multiplicative".to_string(),
            line_tolerance: 0.25,
            spread_tolerance: 0.10,
            min_bookmakers: 2,
            min_ev_percent: 3.0,
            max_plausible_ev: 35.0,
            outlier_high_ratio: 1.8,
            outlier_low_ratio: 0.55,
            one_way_vig_allowance: 0.08,
            min_reference_books: 1,
            sharp_books: Vec::new(),
            playable_books: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Reject numerically meaningless settings.
    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("line_tolerance", self.line_tolerance),
            ("spread_tolerance", self.spread_tolerance),
            ("outlier_high_ratio", self.outlier_high_ratio),
            ("outlier_low_ratio", self.outlier_low_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.min_bookmakers == 0 {
            return Err(EngineError::InvalidConfig(
                "min_bookmakers must be at least 1".to_string(),
            ));
        }
        if self.outlier_low_ratio >= 1.0 || self.outlier_high_ratio <= 1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "outlier ratios must straddle 1.0, got low={} high={}",
                self.outlier_low_ratio, self.outlier_high_ratio
            )));
        }
        if !(0.0..1.0).contains(&self.one_way_vig_allowance) {
            return Err(EngineError::InvalidConfig(format!(
                "one_way_vig_allowance must be in [0, 1), got {}",
                self.one_way_vig_allowance
            )));
        }
        if !self.min_ev_percent.is_finite()
            || !self.max_plausible_ev.is_finite()
            || self.min_ev_percent > self.max_plausible_ev
        {
            return Err(EngineError::InvalidConfig(format!(
                "min_ev_percent ({}) must not exceed max_plausible_ev ({})",
                self.min_ev_percent, self.max_plausible_ev
            )));
        }
        Ok(())
    }

    /// Clusterer settings derived from these knobs.
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            line_tolerance: self.line_tolerance,
            spread_tolerance: self.spread_tolerance,
            min_bookmakers: self.min_bookmakers,
            outliers: OutlierBounds {
                high_ratio: self.outlier_high_ratio,
                low_ratio: self.outlier_low_ratio,
            },
        }
    }
}

/// Snapshot scanning settings for the binary.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    /// JSON snapshot of raw quotes written by the odds collaborator.
    pub snapshot_path: String,
    /// Where to write the ranked report. None = don't persist.
    pub output_path: Option<String>,
    /// Re-scan interval in watch mode.
    pub interval_secs: u64,
    /// How many opportunities to print per scan.
    pub top_n: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            snapshot_path: "quotes.json".to_string(),
            output_path: None,
            interval_secs: 60,
            top_n: 20,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.engine.validate()?;
        Ok(config)
    }
}
