//! Domain ports: trait boundaries between the core and its substrates.

pub mod generator;
pub mod metrics_source;
pub mod prompt_repository;

pub use generator::{GenerationRequest, TextGenerator};
pub use metrics_source::MetricsSource;
pub use prompt_repository::{NewRun, PromptRepository};
