//! Quote snapshot sources and intake.
//!
//! Defines the `QuoteSource` trait the scanner pulls snapshots from.
//! Retrieval itself belongs to external collaborators; sources here only
//! hand over whatever snapshot they were given.

pub mod intake;
pub mod snapshot;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::RawQuote;

/// Abstraction over wherever raw quotes come from.
///
/// Each call returns one complete snapshot; the engine never sees a
/// partially-loaded one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> String;

    /// Load the current snapshot of raw quotes.
    async fn load_snapshot(&self) -> Result<Vec<RawQuote>>;
}
