//! Price outlier rejection.
//!
//! A price far from the rest of its cluster almost always means a
//! mislabelled market (first-half line filed under full match, a
//! different stat) rather than a genuinely generous book.

use crate::types::Quote;

/// Outlier bounds, as ratios to the cluster median price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierBounds {
    /// Prices above `median * high_ratio` are rejected.
    pub high_ratio: f64,
    /// Prices below `median * low_ratio` are rejected.
    pub low_ratio: f64,
}

impl Default for OutlierBounds {
    fn default() -> Self {
        Self {
            high_ratio: 1.8,
            low_ratio: 0.55,
        }
    }
}

impl OutlierBounds {
    pub fn is_outlier(&self, price: f64, median: f64) -> bool {
        let ratio = price / median;
        ratio > self.high_ratio || ratio < self.low_ratio
    }
}

/// Median of a slice (mean of the middle two for even lengths).
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Indices of the prices that are outliers against their own median.
///
/// With fewer than two prices there is nothing to compare against.
pub fn outlier_indices(prices: &[f64], bounds: &OutlierBounds) -> Vec<usize> {
    if prices.len() < 2 {
        return Vec::new();
    }
    let Some(mid) = median(prices) else {
        return Vec::new();
    };
    prices
        .iter()
        .enumerate()
        .filter(|(_, p)| bounds.is_outlier(**p, mid))
        .map(|(i, _)| i)
        .collect()
}

/// Split quotes into kept and rejected by their over/primary price.
pub fn filter_outliers(quotes: Vec<Quote>, bounds: &OutlierBounds) -> (Vec<Quote>, Vec<Quote>) {
    let prices: Vec<f64> = quotes.iter().map(|q| q.over_price).collect();
    let rejected = outlier_indices(&prices, bounds);
    if rejected.is_empty() {
        return (quotes, Vec::new());
    }

    let mut kept = Vec::with_capacity(quotes.len() - rejected.len());
    let mut dropped = Vec::with_capacity(rejected.len());
    for (i, quote) in quotes.into_iter().enumerate() {
        if rejected.contains(&i) {
            dropped.push(quote);
        } else {
            kept.push(quote);
        }
    }
    (kept, dropped)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
