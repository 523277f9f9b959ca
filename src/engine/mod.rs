//! Core engine: the snapshot scan loop that feeds the EV pipeline.

pub mod scanner;
