//! FAIRLINE: cross-bookmaker odds normalization and EV ranking.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod data;
pub mod matching;
pub mod strategy;
pub mod engine;
pub mod storage;
