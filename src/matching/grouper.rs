//! Quote grouping.
//!
//! Buckets quotes by normalized subject and canonical market key. Groups
//! keep first-seen input order so that everything downstream is
//! deterministic for a given snapshot.

use std::collections::HashMap;

use tracing::debug;

use super::normalize::normalize_subject;
use crate::types::Quote;

/// Identity of a group: who, and which market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub subject: String,
    pub market_key: String,
}

/// All quotes for one subject/market, one per (bookmaker, line).
#[derive(Debug, Clone)]
pub struct QuoteGroup {
    pub key: GroupKey,
    /// Subject spelled as in the first quote seen, for display.
    pub display_subject: String,
    pub quotes: Vec<Quote>,
}

/// Quotes the grouper refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupDrops {
    /// Same book, same line, same group: later copy dropped.
    pub duplicates: usize,
    /// Subject empty once annotations are stripped.
    pub blank_subjects: usize,
}

/// Group quotes and drop repeated (bookmaker, normalized line) pairs.
pub fn group_quotes(quotes: Vec<Quote>) -> (Vec<QuoteGroup>, GroupDrops) {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<QuoteGroup> = Vec::new();
    let mut drops = GroupDrops::default();

    for quote in quotes {
        let key = GroupKey {
            subject: normalize_subject(&quote.subject),
            market_key: quote.market_key.clone(),
        };
        if key.subject.is_empty() {
            debug!(subject = %quote.subject, "Subject normalizes to nothing, skipping");
            drops.blank_subjects += 1;
            continue;
        }

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(QuoteGroup {
                key,
                display_subject: quote.subject.trim().to_string(),
                quotes: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];

        let repeated = group
            .quotes
            .iter()
            .any(|q| q.bookmaker == quote.bookmaker && (q.line - quote.line).abs() < 1e-9);
        if repeated {
            debug!(
                bookmaker = %quote.bookmaker,
                subject = %group.key.subject,
                market = %group.key.market_key,
                line = quote.line,
                "Duplicate quote dropped"
            );
            drops.duplicates += 1;
            continue;
        }
        group.quotes.push(quote);
    }

    (groups, drops)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
