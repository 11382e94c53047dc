//! Promptwright - Prompt Optimization Service
//!
//! Promptwright periodically rewrites the operational prompt of a
//! conversational agent, scoring each rewrite against observed failures
//! and business metrics, and durably tracking the lineage of prompt
//! versions and optimization runs.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, ports, and errors
//! - **Service Layer** (`services`): Scoring, objective derivation, and
//!   the optimization orchestrator
//! - **Adapter Layer** (`adapters`): SQLite store, generation client,
//!   metrics client
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, FailedCall, FailureReason, OptimizationPayload, OptimizationResult, OptimizationRun,
    PromptVersion, RunStatus, StoreMetrics,
};
pub use domain::ports::{MetricsSource, NewRun, PromptRepository, TextGenerator};
pub use domain::scoring::{compute_score, ScoreBreakdown, ScoreComponents, ScoreConfig};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ObjectiveRules, PromptOptimizer};
