//! Cross-book market matching: normalization, grouping, clustering
//! and outlier rejection.

pub mod catalog;
pub mod cluster;
pub mod grouper;
pub mod normalize;
pub mod outlier;

use tracing::debug;

use crate::types::{MarketCluster, Quote};
use catalog::MarketCatalog;
use cluster::{cluster_group, ClusterConfig};
use grouper::group_quotes;

/// Counters from one matching pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub groups: usize,
    /// Same book + same line repeats dropped by the grouper.
    pub duplicate_quotes: usize,
    /// Quotes whose subject was empty after normalization.
    pub blank_subjects: usize,
    /// Same book landing twice in one cluster.
    pub duplicate_books: usize,
    pub outliers_removed: usize,
    pub undersized_clusters: usize,
    pub clusters: usize,
}

/// Groups quotes and clusters each group into market lines.
#[derive(Debug, Clone)]
pub struct MarketMatcher {
    config: ClusterConfig,
    catalog: MarketCatalog,
}

impl MarketMatcher {
    pub fn new(config: ClusterConfig, catalog: MarketCatalog) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn catalog(&self) -> &MarketCatalog {
        &self.catalog
    }

    /// Turn normalized quotes into clusters, in first-seen group order.
    pub fn match_quotes(&self, quotes: Vec<Quote>) -> (Vec<MarketCluster>, MatchStats) {
        let mut stats = MatchStats::default();

        let (groups, drops) = group_quotes(quotes);
        stats.groups = groups.len();
        stats.duplicate_quotes = drops.duplicates;
        stats.blank_subjects = drops.blank_subjects;

        let mut clusters = Vec::new();
        for group in &groups {
            let Some(market_type) = group.quotes.first().map(|q| q.market_type) else {
                continue;
            };
            let category = self.catalog.category_for(&group.key.market_key, market_type);
            let outcome = cluster_group(group, category, &self.config);

            stats.duplicate_books += outcome.duplicate_books;
            stats.outliers_removed += outcome.outliers_removed;
            stats.undersized_clusters += outcome.undersized;
            clusters.extend(outcome.clusters);
        }
        stats.clusters = clusters.len();

        debug!(
            groups = stats.groups,
            clusters = stats.clusters,
            outliers = stats.outliers_removed,
            undersized = stats.undersized_clusters,
            "Matching complete"
        );

        (clusters, stats)
    }
}
