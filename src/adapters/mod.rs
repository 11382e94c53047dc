//! Adapters binding domain ports to concrete substrates.

pub mod llm;
pub mod metrics;
pub mod sqlite;
